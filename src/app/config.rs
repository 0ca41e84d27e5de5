//! Deployment-time knobs of the approval logic.

use super::constants::METHOD_OPT_IN_ASSET;

/// Configuration of the approval program.
#[derive(Debug, Clone, Eq, PartialEq)]
#[non_exhaustive]
pub struct Config {
    /// First argument routing a normal call to the asset opt-in handler.
    ///
    /// `None` leaves the handler without a route, so opt-in calls fall through to the remaining
    /// routes like any other unknown method.
    pub opt_in_asset_method: Option<Vec<u8>>,
}

impl Config {
    /// Configuration with the asset opt-in route removed.
    pub fn without_opt_in_asset() -> Self {
        Config {
            opt_in_asset_method: None,
        }
    }

    /// Reads the configuration from an environment-like lookup.
    ///
    /// `APP_OPT_IN_METHOD` overrides the opt-in method name, the value `none` removes the route.
    pub fn from_lookup<F: FnMut(&str) -> Option<String>>(mut lookup: F) -> Self {
        let mut config = Config::default();
        if let Some(method) = lookup("APP_OPT_IN_METHOD") {
            config.opt_in_asset_method = match &*method {
                "none" => None,
                method => Some(method.as_bytes().to_vec()),
            };
        }
        config
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            opt_in_asset_method: Some(METHOD_OPT_IN_ASSET.to_vec()),
        }
    }
}
