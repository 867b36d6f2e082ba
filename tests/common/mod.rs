use carmine::{convert, Conversion, Options};

/// Converts with default options (ES2021) and returns the code.
pub fn js(source: &str) -> String {
    convert(source, &Options::default())
        .unwrap_or_else(|e| panic!("conversion failed for {:?}: {}", source, e))
        .code
}

/// Converts at a specific ES level.
pub fn js_es(source: &str, eslevel: u16) -> String {
    let options = Options {
        eslevel,
        ..Options::default()
    };
    convert(source, &options)
        .unwrap_or_else(|e| panic!("conversion failed for {:?}: {}", source, e))
        .code
}

pub fn convert_with(source: &str, options: &Options) -> Conversion {
    convert(source, options)
        .unwrap_or_else(|e| panic!("conversion failed for {:?}: {}", source, e))
}
