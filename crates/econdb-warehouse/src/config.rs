use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Process configuration, read once at startup and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Settings {
    pub db_url: String,
    pub fx_api_base_url: String,
    pub fx_api_key: String,
    /// Price pages live at `{i3investor_base_url}{CODE}`.
    pub i3investor_base_url: String,
    /// Profile pages live at `{i3investor_profile_url}{CODE}`.
    pub i3investor_profile_url: String,
    pub server_addr: String,
    pub cert_file: PathBuf,
    pub key_file: PathBuf,
    pub static_dir: PathBuf,
    /// Tracked stock codes, in the order they are fetched.
    pub stock_list: Vec<String>,
}

impl Settings {
    /// Load from the process environment, honouring a `.env` file when present.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    /// Build settings from any key lookup; `DB_URL` is the only required key.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .unwrap_or_else(|| default.to_string())
        };

        let db_url = get("DB_URL", "");
        if db_url.is_empty() {
            return Err(Error::Config("DB_URL"));
        }

        let stock_list = parse_stock_list(&get("STOCK_LIST", ""));
        if stock_list.is_empty() {
            warn!("STOCK_LIST is not set or empty; batch stock commands will do nothing");
        }

        let settings = Self {
            db_url,
            fx_api_base_url: get("FX_API_BASE_URL", "")
                .trim_end_matches('/')
                .to_string(),
            fx_api_key: get("FX_API_KEY", ""),
            i3investor_base_url: get("I3_INVESTOR_BASE_URL", ""),
            i3investor_profile_url: get("I3_INVESTOR_STOCK_PROFILE_URL", ""),
            server_addr: get("SERVER_ADDR", "0.0.0.0:8443"),
            cert_file: PathBuf::from(get("CERT_FILE", "./certs/cert.pem")),
            key_file: PathBuf::from(get("KEY_FILE", "./certs/key.pem")),
            static_dir: PathBuf::from(get("STATIC_DIR", "./frontend")),
            stock_list,
        };

        for (key, value) in [
            ("FX_API_BASE_URL", &settings.fx_api_base_url),
            ("I3_INVESTOR_BASE_URL", &settings.i3investor_base_url),
            ("I3_INVESTOR_STOCK_PROFILE_URL", &settings.i3investor_profile_url),
        ] {
            if value.is_empty() {
                warn!("{key} is not set; commands depending on it will fail");
            }
        }
        info!("configuration loaded, tracking {} stocks", settings.stock_list.len());

        Ok(settings)
    }

    /// Check a setting an operation depends on; the error names the missing key.
    pub fn require<'a>(value: &'a str, key: &'static str) -> Result<&'a str> {
        if value.trim().is_empty() {
            Err(Error::Config(key))
        } else {
            Ok(value)
        }
    }

    /// TLS termination sits in front of the query API; the paths are only checked so a
    /// misconfigured deployment shows up in the log.
    pub fn warn_missing_tls_files(&self) {
        for (name, path) in [("certificate", &self.cert_file), ("key", &self.key_file)] {
            if !Path::new(path).exists() {
                warn!("{name} file not found at {}", path.display());
            }
        }
    }
}

fn parse_stock_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn db_url_is_required() {
        let err = Settings::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, Error::Config("DB_URL")));

        let err = Settings::from_lookup(lookup(&[("DB_URL", "   ")])).unwrap_err();
        assert!(matches!(err, Error::Config("DB_URL")));
    }

    #[test]
    fn defaults_fill_optional_settings() {
        let settings = Settings::from_lookup(lookup(&[("DB_URL", "postgres://x")])).unwrap();
        assert_eq!(settings.server_addr, "0.0.0.0:8443");
        assert_eq!(settings.cert_file, PathBuf::from("./certs/cert.pem"));
        assert_eq!(settings.key_file, PathBuf::from("./certs/key.pem"));
        assert_eq!(settings.static_dir, PathBuf::from("./frontend"));
        assert!(settings.fx_api_base_url.is_empty());
        assert!(settings.stock_list.is_empty());
    }

    #[test]
    fn stock_list_is_split_trimmed_and_ordered() {
        let settings = Settings::from_lookup(lookup(&[
            ("DB_URL", "postgres://x"),
            ("STOCK_LIST", " 1155, 5347 ,,1295 ,"),
        ]))
        .unwrap();
        assert_eq!(settings.stock_list, vec!["1155", "5347", "1295"]);
    }

    #[test]
    fn rate_api_base_loses_trailing_slash() {
        let settings = Settings::from_lookup(lookup(&[
            ("DB_URL", "postgres://x"),
            ("FX_API_BASE_URL", "https://api.bnm.gov.my/public/exchange-rate/"),
        ]))
        .unwrap();
        assert_eq!(
            settings.fx_api_base_url,
            "https://api.bnm.gov.my/public/exchange-rate"
        );
    }

    #[test]
    fn require_names_the_missing_key() {
        assert!(matches!(
            Settings::require("", "FX_API_BASE_URL"),
            Err(Error::Config("FX_API_BASE_URL"))
        ));
        assert_eq!(Settings::require("https://x", "K").unwrap(), "https://x");
    }
}
