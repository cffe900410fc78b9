use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use crate::bundle::BundleConfig;
use crate::cache::PackingCache;
use crate::packer::PackingConfig;
use crate::pricing::{PricingConfig, ShippingRule};

const ENV_PREFIX: &str = "LOAD_IT_NOW_";

/// Source of raw configuration values by full variable name.
type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Complete application configuration, loaded from environment variables or default values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub pricing: PricingConfig,
    pub bundle: BundleConfig,
    pub packing: PackingConfig,
    /// Number of memoized packing runs; 0 disables the cache.
    pub cache_capacity: usize,
}

impl AppConfig {
    /// Creates a configuration from the currently available environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(&env_string)
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: Lookup<'_>) -> Self {
        Self {
            api: ApiConfig::from_lookup(lookup),
            pricing: pricing_from_lookup(lookup),
            bundle: bundle_from_lookup(lookup),
            packing: packing_from_lookup(lookup),
            cache_capacity: load_usize_with_warning(
                lookup,
                "PACKING_CACHE_CAPACITY",
                PackingCache::DEFAULT_CAPACITY,
            ),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_lookup(&|_| None)
    }
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    bind_ip: IpAddr,
    display_host: String,
    port: u16,
}

impl ApiConfig {
    const DEFAULT_HOST: &'static str = "0.0.0.0";
    const DEFAULT_IP: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
    const DEFAULT_PORT: u16 = 8080;

    fn from_lookup(lookup: Lookup<'_>) -> Self {
        let host_var = var_name("API_HOST");
        let (bind_ip, display_host) = match read(lookup, &host_var) {
            Some(raw) => match raw.parse::<IpAddr>() {
                Ok(ip) => (ip, raw),
                Err(err) => {
                    tracing::warn!(
                        "Could not parse {} ('{}'): {}. Using {}.",
                        host_var,
                        raw,
                        err,
                        Self::DEFAULT_HOST
                    );
                    (Self::DEFAULT_IP, Self::DEFAULT_HOST.to_string())
                }
            },
            None => (Self::DEFAULT_IP, Self::DEFAULT_HOST.to_string()),
        };

        let port_var = var_name("API_PORT");
        let port = match read(lookup, &port_var) {
            Some(raw) => match raw.parse::<u16>() {
                Ok(value) if value != 0 => value,
                Ok(_) => {
                    tracing::warn!("{} must not be 0. Using {}.", port_var, Self::DEFAULT_PORT);
                    Self::DEFAULT_PORT
                }
                Err(err) => {
                    tracing::warn!(
                        "Could not parse {} ('{}'): {}. Using {}.",
                        port_var,
                        raw,
                        err,
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
            },
            None => Self::DEFAULT_PORT,
        };

        Self {
            bind_ip,
            display_host,
            port,
        }
    }

    /// Socket address to bind the server to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }

    /// Visible hostname for logging and hints.
    pub fn display_host(&self) -> &str {
        &self.display_host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Indicates whether binding to all interfaces.
    pub fn binds_to_all_interfaces(&self) -> bool {
        match self.bind_ip {
            IpAddr::V4(addr) => addr == Ipv4Addr::UNSPECIFIED,
            IpAddr::V6(addr) => addr == Ipv6Addr::UNSPECIFIED,
        }
    }
}

fn pricing_from_lookup(lookup: Lookup<'_>) -> PricingConfig {
    let reference_price = load_f64_with_warning(
        lookup,
        "PRICING_REFERENCE_PRICE",
        PricingConfig::DEFAULT_REFERENCE_PRICE,
        |value| value >= 0.0,
        "must not be negative",
    );
    let reference_edge_cm = load_f64_with_warning(
        lookup,
        "PRICING_REFERENCE_EDGE_CM",
        PricingConfig::DEFAULT_REFERENCE_EDGE_CM,
        |value| value > 0.0,
        "must be greater than 0",
    );
    let rate_per_kg = load_f64_with_warning(
        lookup,
        "PRICING_RATE_PER_KG",
        PricingConfig::DEFAULT_RATE_PER_KG,
        |value| value >= 0.0,
        "must not be negative",
    );
    let custom_surcharge = load_f64_with_warning(
        lookup,
        "PRICING_CUSTOM_SURCHARGE",
        PricingConfig::DEFAULT_CUSTOM_SURCHARGE,
        |value| value >= 1.0,
        "must be at least 1",
    );

    PricingConfig::builder()
        .reference_price(reference_price)
        .reference_edge_cm(reference_edge_cm)
        .custom_surcharge(custom_surcharge)
        .shipping(ShippingRule::Flat { rate_per_kg })
        .build()
}

fn bundle_from_lookup(lookup: Lookup<'_>) -> BundleConfig {
    let air_gap_factor = load_f64_with_warning(
        lookup,
        "BUNDLE_AIR_GAP_FACTOR",
        BundleConfig::DEFAULT_AIR_GAP_FACTOR,
        |value| value >= 1.0,
        "must be at least 1",
    );
    BundleConfig::builder().air_gap_factor(air_gap_factor).build()
}

fn packing_from_lookup(lookup: Lookup<'_>) -> PackingConfig {
    let name = var_name("PACKING_ENFORCE_WEIGHT_LIMIT");
    let enforce_weight_limit = read(lookup, &name)
        .and_then(|raw| parse_bool(&raw, &name))
        .unwrap_or(PackingConfig::DEFAULT_ENFORCE_WEIGHT_LIMIT);
    if !enforce_weight_limit {
        tracing::warn!("Container weight limits are advisory only ({} = false).", name);
    }

    PackingConfig::builder()
        .enforce_weight_limit(enforce_weight_limit)
        .build()
}

fn var_name(suffix: &str) -> String {
    format!("{}{}", ENV_PREFIX, suffix)
}

fn env_string(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) => Some(value),
        Err(env::VarError::NotPresent) => None,
        Err(err) => {
            tracing::warn!("Access to {} failed: {}. Using default value.", name, err);
            None
        }
    }
}

/// Trimmed, non-empty value of a variable.
fn read(lookup: Lookup<'_>, name: &str) -> Option<String> {
    let value = lookup(name)?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

fn parse_bool(raw: &str, var_name: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        other => {
            tracing::warn!(
                "Could not interpret {} ('{}') as boolean value. Using default value.",
                var_name,
                other
            );
            None
        }
    }
}

fn load_f64_with_warning(
    lookup: Lookup<'_>,
    suffix: &str,
    default: f64,
    validator: impl Fn(f64) -> bool,
    invalid_hint: &str,
) -> f64 {
    let name = var_name(suffix);
    match read(lookup, &name) {
        Some(raw) => match raw.parse::<f64>() {
            Ok(value) if value.is_finite() && validator(value) => {
                let tolerance = (default.abs().max(1.0)) * 1e-9;
                if (value - default).abs() > tolerance {
                    tracing::info!("{} overrides the default ({} instead of {}).", name, value, default);
                }
                value
            }
            Ok(_) => {
                tracing::warn!(
                    "{} contains invalid value '{}': {}. Using {}.",
                    name,
                    raw,
                    invalid_hint,
                    default
                );
                default
            }
            Err(err) => {
                tracing::warn!(
                    "Could not parse {} ('{}') as number: {}. Using {}.",
                    name,
                    raw,
                    err,
                    default
                );
                default
            }
        },
        None => default,
    }
}

fn load_usize_with_warning(lookup: Lookup<'_>, suffix: &str, default: usize) -> usize {
    let name = var_name(suffix);
    match read(lookup, &name) {
        Some(raw) => raw.parse::<usize>().unwrap_or_else(|err| {
            tracing::warn!(
                "Could not parse {} ('{}'): {}. Using {}.",
                name,
                raw,
                err,
                default
            );
            default
        }),
        None => default,
    }
}
