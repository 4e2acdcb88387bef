use regex::Regex;
use std::sync::LazyLock;

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

regex!(WHITESPACE_REGEX, r"\s+");
regex!(DISALLOWED_REGEX, r"[^a-z0-9-]");
regex!(HYPHENS_REGEX, r"-{2,}");
regex!(EXTENSION_REGEX, r"^[a-z0-9]{1,10}$");

/// Slice size used by the batch runner unless configured otherwise.
pub const DEFAULT_CONCURRENCY: usize = 3;
pub const MIB: u64 = 1024 * 1024;
