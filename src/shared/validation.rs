use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Regex for validating uploaded file names
    /// Alphanumeric, underscore or dash stem and extension, separated by a dot
    /// - Valid: "report.txt", "my_file-1.tar", "a.b"
    /// - Invalid: "example", ".env", "report.", "my file.txt", "a.b.c"
    pub static ref FILE_NAME_REGEX: Regex =
        Regex::new(r"^[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+$").unwrap();
}
