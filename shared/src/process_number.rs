use std::fmt;

/// Digits in a canonical national (CNJ) process number.
pub const PROCESS_NUMBER_DIGITS: usize = 20;

/// Returns true iff `raw` holds exactly 20 digits once every non-digit
/// character is dropped. Punctuation and spacing are irrelevant.
pub fn is_valid(raw: &str) -> bool {
    raw.chars().filter(char::is_ascii_digit).count() == PROCESS_NUMBER_DIGITS
}

/// A process number exactly as read from input, surrounding whitespace aside.
///
/// The raw form is what both portals are queried with; validity is checked
/// separately so that malformed numbers can still be carried through to the
/// output.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ProcessNumber(String);

impl ProcessNumber {
    pub fn new<S: Into<String>>(raw: S) -> Self {
        let raw = raw.into();
        ProcessNumber(raw.trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn digits(&self) -> String {
        self.0.chars().filter(char::is_ascii_digit).collect()
    }

    pub fn is_valid(&self) -> bool {
        is_valid(&self.0)
    }
}

impl fmt::Display for ProcessNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProcessNumber {
    fn from(raw: &str) -> Self {
        ProcessNumber::new(raw)
    }
}
