use crate::shared::error::RemediationError;
use crate::shared::Result;
use pep440_rs::{Version, VersionSpecifiers};
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

/// Python version assumed when the configuration does not pin one
pub const DEFAULT_PYTHON_VERSION: &str = "3.12";

const KNOWN_VARIABLES: &[&str] = &[
    "os_name",
    "sys_platform",
    "platform_machine",
    "platform_python_implementation",
    "platform_release",
    "platform_system",
    "platform_version",
    "python_version",
    "python_full_version",
    "implementation_name",
    "implementation_version",
];

/// Values for PEP 508 environment marker variables.
///
/// Host-derived defaults describe the machine running the tool; anything
/// about the target interpreter can be overridden from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerEnvironment {
    values: BTreeMap<String, String>,
}

impl MarkerEnvironment {
    /// Environment of the current host with a default CPython interpreter
    pub fn current() -> Self {
        let (os_name, sys_platform, platform_system) = match std::env::consts::OS {
            "windows" => ("nt", "win32", "Windows"),
            "macos" => ("posix", "darwin", "Darwin"),
            "linux" => ("posix", "linux", "Linux"),
            other => ("posix", other, other),
        };
        let platform_machine = match (std::env::consts::OS, std::env::consts::ARCH) {
            ("macos", "aarch64") => "arm64",
            ("windows", "x86_64") => "AMD64",
            (_, arch) => arch,
        };
        let full_version = format!("{}.0", DEFAULT_PYTHON_VERSION);

        let mut values = BTreeMap::new();
        values.insert("os_name".to_string(), os_name.to_string());
        values.insert("sys_platform".to_string(), sys_platform.to_string());
        values.insert("platform_system".to_string(), platform_system.to_string());
        values.insert("platform_machine".to_string(), platform_machine.to_string());
        values.insert("platform_release".to_string(), String::new());
        values.insert("platform_version".to_string(), String::new());
        values.insert(
            "platform_python_implementation".to_string(),
            "CPython".to_string(),
        );
        values.insert("implementation_name".to_string(), "cpython".to_string());
        values.insert(
            "python_version".to_string(),
            DEFAULT_PYTHON_VERSION.to_string(),
        );
        values.insert("python_full_version".to_string(), full_version.clone());
        values.insert("implementation_version".to_string(), full_version);
        Self { values }
    }

    /// Applies configured overrides. Setting `python_version` alone also
    /// moves `python_full_version` unless that is overridden too.
    ///
    /// # Errors
    /// Returns a validation error for a variable PEP 508 does not define.
    pub fn with_overrides(mut self, overrides: &HashMap<String, String>) -> Result<Self> {
        for (key, value) in overrides {
            let key = normalize_variable(key);
            if !KNOWN_VARIABLES.contains(&key.as_str()) {
                return Err(RemediationError::Validation {
                    message: format!("Unknown marker variable '{}' in marker_environment", key),
                }
                .into());
            }
            self.values.insert(key, value.clone());
        }

        if overrides.contains_key("python_version") && !overrides.contains_key("python_full_version")
        {
            let full = format!("{}.0", self.values["python_version"]);
            self.values
                .insert("python_full_version".to_string(), full.clone());
            self.values.insert("implementation_version".to_string(), full);
        }
        Ok(self)
    }

    pub fn get(&self, variable: &str) -> Option<&str> {
        self.values.get(variable).map(String::as_str)
    }

    /// Evaluates a marker expression such as
    /// `python_version < "3.11" and sys_platform != "win32"`.
    ///
    /// `extra` always compares as the empty string, so extra-only
    /// requirements never apply.
    pub fn evaluate(&self, marker: &str) -> Result<bool> {
        let tokens = tokenize(marker)?;
        let mut parser = Parser {
            tokens: &tokens,
            pos: 0,
            env: self,
            marker,
        };
        let value = parser.parse_or()?;
        if parser.pos != tokens.len() {
            return Err(invalid(marker, "unexpected trailing input"));
        }
        Ok(value)
    }
}

impl Default for MarkerEnvironment {
    fn default() -> Self {
        Self::current()
    }
}

/// Returns true when a marker references the `extra` variable
pub fn mentions_extra(marker: &str) -> bool {
    tokenize(marker)
        .map(|tokens| {
            tokens
                .iter()
                .any(|t| matches!(t, Token::Ident(name) if name == "extra"))
        })
        .unwrap_or(false)
}

fn normalize_variable(name: &str) -> String {
    // Legacy dotted spellings, e.g. `os.name`
    match name {
        "os.name" => "os_name".to_string(),
        "sys.platform" => "sys_platform".to_string(),
        "platform.version" => "platform_version".to_string(),
        "platform.machine" => "platform_machine".to_string(),
        "platform.python_implementation" => "platform_python_implementation".to_string(),
        "python_implementation" => "platform_python_implementation".to_string(),
        other => other.to_string(),
    }
}

fn invalid(marker: &str, reason: &str) -> anyhow::Error {
    RemediationError::Validation {
        message: format!("Invalid environment marker '{}': {}", marker, reason),
    }
    .into()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompareOp {
    Lt,
    Le,
    Eq,
    Ne,
    Ge,
    Gt,
    Compatible,
    Arbitrary,
    In,
    NotIn,
}

impl CompareOp {
    fn as_str(self) -> &'static str {
        match self {
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Ge => ">=",
            CompareOp::Gt => ">",
            CompareOp::Compatible => "~=",
            CompareOp::Arbitrary => "===",
            CompareOp::In => "in",
            CompareOp::NotIn => "not in",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    LParen,
    RParen,
    And,
    Or,
    Op(CompareOp),
    Ident(String),
    Str(String),
}

fn tokenize(marker: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = marker.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '\'' | '"' => {
                let end = chars[i + 1..]
                    .iter()
                    .position(|&ch| ch == c)
                    .ok_or_else(|| invalid(marker, "unterminated string"))?;
                tokens.push(Token::Str(chars[i + 1..i + 1 + end].iter().collect()));
                i += end + 2;
            }
            '<' | '>' | '=' | '!' | '~' => {
                let rest: String = chars[i..chars.len().min(i + 3)].iter().collect();
                let (op, len) = if rest.starts_with("===") {
                    (CompareOp::Arbitrary, 3)
                } else if rest.starts_with("==") {
                    (CompareOp::Eq, 2)
                } else if rest.starts_with("!=") {
                    (CompareOp::Ne, 2)
                } else if rest.starts_with("<=") {
                    (CompareOp::Le, 2)
                } else if rest.starts_with(">=") {
                    (CompareOp::Ge, 2)
                } else if rest.starts_with("~=") {
                    (CompareOp::Compatible, 2)
                } else if rest.starts_with('<') {
                    (CompareOp::Lt, 1)
                } else if rest.starts_with('>') {
                    (CompareOp::Gt, 1)
                } else {
                    return Err(invalid(marker, "unknown operator"));
                };
                tokens.push(Token::Op(op));
                i += len;
            }
            c if c.is_ascii_alphanumeric() || c == '_' || c == '.' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_ascii_alphanumeric() || chars[i] == '_' || chars[i] == '.')
                {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                match word.as_str() {
                    "and" => tokens.push(Token::And),
                    "or" => tokens.push(Token::Or),
                    "in" => tokens.push(Token::Op(CompareOp::In)),
                    "not" => {
                        if tokens_next_word(&chars, i) == Some("in".to_string()) {
                            while chars[i].is_whitespace() {
                                i += 1;
                            }
                            i += 2;
                            tokens.push(Token::Op(CompareOp::NotIn));
                        } else {
                            return Err(invalid(marker, "'not' must be followed by 'in'"));
                        }
                    }
                    _ => tokens.push(Token::Ident(normalize_variable(&word))),
                }
            }
            _ => return Err(invalid(marker, &format!("unexpected character '{}'", c))),
        }
    }

    Ok(tokens)
}

fn tokens_next_word(chars: &[char], mut i: usize) -> Option<String> {
    while i < chars.len() && chars[i].is_whitespace() {
        i += 1;
    }
    let start = i;
    while i < chars.len() && chars[i].is_ascii_alphabetic() {
        i += 1;
    }
    (i > start).then(|| chars[start..i].iter().collect())
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    env: &'a MarkerEnvironment,
    marker: &'a str,
}

impl Parser<'_> {
    fn parse_or(&mut self) -> Result<bool> {
        let mut value = self.parse_and()?;
        while self.tokens.get(self.pos) == Some(&Token::Or) {
            self.pos += 1;
            let rhs = self.parse_and()?;
            value = value || rhs;
        }
        Ok(value)
    }

    fn parse_and(&mut self) -> Result<bool> {
        let mut value = self.parse_atom()?;
        while self.tokens.get(self.pos) == Some(&Token::And) {
            self.pos += 1;
            let rhs = self.parse_atom()?;
            value = value && rhs;
        }
        Ok(value)
    }

    fn parse_atom(&mut self) -> Result<bool> {
        if self.tokens.get(self.pos) == Some(&Token::LParen) {
            self.pos += 1;
            let value = self.parse_or()?;
            if self.tokens.get(self.pos) != Some(&Token::RParen) {
                return Err(invalid(self.marker, "missing ')'"));
            }
            self.pos += 1;
            return Ok(value);
        }

        let lhs = self.parse_value()?;
        let op = match self.tokens.get(self.pos) {
            Some(Token::Op(op)) => *op,
            _ => return Err(invalid(self.marker, "expected a comparison operator")),
        };
        self.pos += 1;
        let rhs = self.parse_value()?;
        Ok(compare(&lhs, op, &rhs))
    }

    fn parse_value(&mut self) -> Result<String> {
        let value = match self.tokens.get(self.pos) {
            Some(Token::Str(s)) => s.clone(),
            Some(Token::Ident(name)) if name == "extra" => String::new(),
            Some(Token::Ident(name)) => self
                .env
                .get(name)
                .map(str::to_string)
                .ok_or_else(|| invalid(self.marker, &format!("unknown variable '{}'", name)))?,
            _ => return Err(invalid(self.marker, "expected a variable or quoted string")),
        };
        self.pos += 1;
        Ok(value)
    }
}

fn compare(lhs: &str, op: CompareOp, rhs: &str) -> bool {
    match op {
        CompareOp::In => rhs.contains(lhs),
        CompareOp::NotIn => !rhs.contains(lhs),
        CompareOp::Arbitrary => lhs == rhs,
        _ => {
            let specifier = VersionSpecifiers::from_str(&format!("{}{}", op.as_str(), rhs));
            if let (Ok(version), Ok(specifier)) = (Version::from_str(lhs), specifier) {
                return specifier.contains(&version);
            }
            match op {
                CompareOp::Eq => lhs == rhs,
                CompareOp::Ne => lhs != rhs,
                CompareOp::Lt => lhs < rhs,
                CompareOp::Le => lhs <= rhs,
                CompareOp::Gt => lhs > rhs,
                CompareOp::Ge => lhs >= rhs,
                _ => false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(python: &str, platform: &str) -> MarkerEnvironment {
        let mut overrides = HashMap::new();
        overrides.insert("python_version".to_string(), python.to_string());
        overrides.insert("sys_platform".to_string(), platform.to_string());
        MarkerEnvironment::current().with_overrides(&overrides).unwrap()
    }

    #[test]
    fn test_python_version_comparisons_use_version_order() {
        let env = env("3.10", "linux");
        assert!(env.evaluate("python_version >= \"3.8\"").unwrap());
        assert!(env.evaluate("python_version > '3.9'").unwrap());
        assert!(!env.evaluate("python_version < \"3.9\"").unwrap());
        assert!(env.evaluate("python_version == \"3.*\"").unwrap());
        assert!(env.evaluate("python_full_version >= '3.10.0'").unwrap());
    }

    #[test]
    fn test_string_comparisons() {
        let env = env("3.12", "linux");
        assert!(env.evaluate("sys_platform == 'linux'").unwrap());
        assert!(!env.evaluate("sys_platform == \"win32\"").unwrap());
        assert!(env.evaluate("'lin' in sys_platform").unwrap());
        assert!(env.evaluate("sys_platform not in 'win32 cygwin'").unwrap());
    }

    #[test]
    fn test_boolean_operators_and_parentheses() {
        let env = env("3.7", "win32");
        assert!(env
            .evaluate("python_version < \"3.8\" and sys_platform == \"win32\"")
            .unwrap());
        assert!(env
            .evaluate("(sys_platform == 'linux' or sys_platform == 'win32') and python_version < '3.8'")
            .unwrap());
        assert!(!env
            .evaluate("sys_platform == 'linux' or python_version >= '3.8'")
            .unwrap());
    }

    #[test]
    fn test_extra_never_matches() {
        let env = MarkerEnvironment::current();
        assert!(!env.evaluate("extra == \"socks\"").unwrap());
        assert!(mentions_extra("python_version > '3' and extra == 'test'"));
        assert!(!mentions_extra("python_version > '3'"));
    }

    #[test]
    fn test_python_version_override_moves_full_version() {
        let env = env("3.9", "linux");
        assert_eq!(env.get("python_full_version"), Some("3.9.0"));
    }

    #[test]
    fn test_invalid_markers_are_errors() {
        let env = MarkerEnvironment::current();
        assert!(env.evaluate("python_version").is_err());
        assert!(env.evaluate("python_version >= '3.8' and").is_err());
        assert!(env.evaluate("(python_version >= '3.8'").is_err());
        assert!(env.evaluate("python_version >= \"3.8").is_err());
        assert!(env.evaluate("unknown_var == 'x'").is_err());
    }

    #[test]
    fn test_unknown_override_rejected() {
        let mut overrides = HashMap::new();
        overrides.insert("bogus".to_string(), "1".to_string());
        assert!(MarkerEnvironment::current()
            .with_overrides(&overrides)
            .is_err());
    }
}
