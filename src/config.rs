//! Process configuration: command line, environment, and the billing secret.

use crate::error::{BatchError, Result};
use crate::pipeline::{Pipeline, RunOptions};
use crate::row::DecodePolicy;
use crate::stripe::{DEFAULT_API_BASE, DEFAULT_TIMEOUT_SECS};
use clap::{ArgAction, Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable holding the billing secret.
pub const SECRET_KEY_VAR: &str = "STRIPE_SECRET_KEY";

/// Command-line options. Every option can also be set from the environment.
#[derive(Debug, Parser)]
#[command(name = "billing-batch", version, about)]
pub struct Cli {
    /// Cancel subscriptions whose column 13 starts with the prefix
    #[arg(long, env = "REMOVE_SUBSCRIPTIONS", action = ArgAction::Set, value_parser = parse_toggle, default_value = "0", num_args = 0..=1, default_missing_value = "1")]
    pub remove_subscriptions: bool,

    /// Delete customers whose column 3 starts with the prefix
    #[arg(long, env = "REMOVE_CUSTOMERS", action = ArgAction::Set, value_parser = parse_toggle, default_value = "0", num_args = 0..=1, default_missing_value = "1")]
    pub remove_customers: bool,

    /// Create a single-use 100% coupon for every code in coupons.csv
    #[arg(long, env = "UPLOAD_COUPONS", action = ArgAction::Set, value_parser = parse_toggle, default_value = "0", num_args = 0..=1, default_missing_value = "1")]
    pub upload_coupons: bool,

    /// Delete every coupon listed in coupons.csv
    #[arg(long, env = "DELETE_COUPONS", action = ArgAction::Set, value_parser = parse_toggle, default_value = "0", num_args = 0..=1, default_missing_value = "1")]
    pub delete_coupons: bool,

    /// Literal, case-sensitive prefix selecting rows to remove
    #[arg(long, env = "MATCH_PREFIX")]
    pub prefix: Option<String>,

    /// Field delimiter of the input files
    #[arg(long, env = "CSV_DELIMITER", value_parser = parse_delimiter, default_value = ",")]
    pub delimiter: u8,

    /// Directory containing the input files
    #[arg(long, env = "DATA_DIR", default_value = ".")]
    pub data_dir: PathBuf,

    /// Pause after each remote call, in milliseconds
    #[arg(long, env = "PACING_DELAY_MS", default_value_t = 100)]
    pub delay_ms: u64,

    /// What to do with a line that cannot be decoded
    #[arg(long, env = "ON_DECODE_ERROR", value_enum, default_value_t = OnDecodeError::FailFast)]
    pub on_decode_error: OnDecodeError,

    /// Billing API base URL
    #[arg(long, env = "STRIPE_API_BASE", default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// Timeout for each API request, in seconds
    #[arg(long, env = "STRIPE_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,
}

/// Command-line spelling of [`DecodePolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OnDecodeError {
    /// Abandon the file, mutate nothing
    FailFast,
    /// Skip the bad line and continue
    Skip,
}

impl From<OnDecodeError> for DecodePolicy {
    fn from(value: OnDecodeError) -> Self {
        match value {
            OnDecodeError::FailFast => DecodePolicy::FailFast,
            OnDecodeError::Skip => DecodePolicy::Skip,
        }
    }
}

impl Cli {
    /// Selected pipelines, in run order.
    pub fn pipelines(&self) -> Vec<Pipeline> {
        Pipeline::ALL
            .into_iter()
            .filter(|p| match p {
                Pipeline::RemoveSubscriptions => self.remove_subscriptions,
                Pipeline::RemoveCustomers => self.remove_customers,
                Pipeline::UploadCoupons => self.upload_coupons,
                Pipeline::DeleteCoupons => self.delete_coupons,
            })
            .collect()
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            data_dir: self.data_dir.clone(),
            delimiter: self.delimiter,
            decode_policy: self.on_decode_error.into(),
            prefix: self.prefix.clone(),
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Reads the billing secret from the environment.
pub fn secret_key_from_env() -> Result<String> {
    secret_key(std::env::var(SECRET_KEY_VAR).ok())
}

/// Validates a secret value: it must be present and non-empty.
pub fn secret_key(value: Option<String>) -> Result<String> {
    match value {
        Some(key) if !key.is_empty() => Ok(key),
        _ => Err(BatchError::MissingCredential {
            var: SECRET_KEY_VAR,
        }),
    }
}

/// Interprets a toggle the way an integer parse would: a leading, optionally
/// signed run of digits (hex after `0x`/`0X`) that is non-zero enables;
/// anything else disables.
pub fn parse_toggle(value: &str) -> std::result::Result<bool, String> {
    let trimmed = value.trim_start();
    let unsigned = trimmed
        .strip_prefix('-')
        .or_else(|| trimmed.strip_prefix('+'))
        .unwrap_or(trimmed);

    let (body, is_digit): (&str, fn(&char) -> bool) = match unsigned
        .strip_prefix("0x")
        .or_else(|| unsigned.strip_prefix("0X"))
    {
        Some(hex) => (hex, char::is_ascii_hexdigit),
        None => (unsigned, char::is_ascii_digit),
    };
    let digits = &body[..body.find(|c: char| !is_digit(&c)).unwrap_or(body.len())];

    Ok(digits.bytes().any(|b| b != b'0'))
}

/// Accepts exactly one ASCII character as the field delimiter.
pub fn parse_delimiter(value: &str) -> std::result::Result<u8, String> {
    match value.as_bytes() {
        [byte] if byte.is_ascii() => Ok(*byte),
        _ => Err(format!(
            "delimiter must be a single ASCII character, got {:?}",
            value
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use clap::{CommandFactory, FromArgMatches};

    /// Parses `args` with every environment fallback switched off, so the
    /// caller's shell cannot leak into the result.
    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["billing-batch"];
        argv.extend_from_slice(args);

        let command = Cli::command().mut_args(|arg| arg.env(None::<&'static str>));
        let matches = command.try_get_matches_from(argv).unwrap();
        Cli::from_arg_matches(&matches).unwrap()
    }

    #[test]
    fn test_parse_toggle() {
        assert!(parse_toggle("1").unwrap());
        assert!(parse_toggle("2").unwrap());
        assert!(parse_toggle("-1").unwrap());
        assert!(parse_toggle(" 1abc").unwrap());
        assert!(!parse_toggle("0").unwrap());
        assert!(!parse_toggle("000").unwrap());
        assert!(!parse_toggle("").unwrap());
        assert!(!parse_toggle("true").unwrap());
        assert!(!parse_toggle("abc1").unwrap());
    }

    #[test]
    fn test_parse_toggle_hex() {
        assert!(parse_toggle("0x1").unwrap());
        assert!(parse_toggle("0XfF").unwrap());
        assert!(parse_toggle("-0x10").unwrap());
        assert!(!parse_toggle("0x0").unwrap());
        assert!(!parse_toggle("0x").unwrap());
        assert!(!parse_toggle("0xg1").unwrap());
    }

    #[test]
    fn test_parse_delimiter() {
        assert_eq!(parse_delimiter(",").unwrap(), b',');
        assert_eq!(parse_delimiter(";").unwrap(), b';');
        assert_eq!(parse_delimiter("\t").unwrap(), b'\t');
        assert!(parse_delimiter(",,").is_err());
        assert!(parse_delimiter("").is_err());
        assert!(parse_delimiter("§").is_err());
    }

    #[test]
    fn test_secret_key_validation() {
        assert_eq!(secret_key(Some("sk_test".to_string())).unwrap(), "sk_test");
        assert!(matches!(
            secret_key(Some(String::new())),
            Err(BatchError::MissingCredential { .. })
        ));
        assert!(matches!(
            secret_key(None),
            Err(BatchError::MissingCredential { .. })
        ));
    }

    #[test]
    fn test_flags_select_pipelines_in_order() {
        let cli = parse(&["--delete-coupons", "--remove-subscriptions", "1"]);
        assert_eq!(
            cli.pipelines(),
            vec![Pipeline::RemoveSubscriptions, Pipeline::DeleteCoupons]
        );

        let cli = parse(&["--remove-customers", "0"]);
        assert!(cli.pipelines().is_empty());
    }

    #[test]
    fn test_defaults_without_flags() {
        let cli = parse(&[]);
        assert!(cli.pipelines().is_empty());
        assert_eq!(cli.prefix, None);
        assert_eq!(cli.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn test_run_options() {
        let cli = parse(&[
            "--prefix",
            "💰",
            "--delimiter",
            ";",
            "--data-dir",
            "exports",
            "--on-decode-error",
            "skip",
            "--delay-ms",
            "250",
        ]);
        let options = cli.run_options();

        assert_eq!(options.prefix.as_deref(), Some("💰"));
        assert_eq!(options.delimiter, b';');
        assert_eq!(options.data_dir, PathBuf::from("exports"));
        assert_eq!(options.decode_policy, DecodePolicy::Skip);
        assert_eq!(cli.delay(), Duration::from_millis(250));
    }
}
