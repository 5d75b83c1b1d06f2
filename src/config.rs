use dotenvy::dotenv;
use std::env;
use std::fmt::Debug;
use std::str::FromStr;

fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: Debug,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|e| panic!("{key} is not valid: {e:?}")),
        Err(_) => default,
    }
}

/// Deviation-band boundaries for the classifier and the review workflow.
///
/// The source data had these scattered as literals; here they are one
/// configuration object, overridable per deployment through the
/// environment. All values are minutes except the refusal threshold.
#[derive(Debug, Clone, Copy)]
pub struct ReconThresholds {
    /// Lateness at or under this produces no anomaly.
    pub late_grace_min: i32,
    /// Lateness up to this is attention tier; beyond is critical.
    pub late_attention_max_min: i32,
    /// Early-departure grace, symmetric with lateness.
    pub depart_grace_min: i32,
    /// Early-departure attention bound.
    pub depart_attention_max_min: i32,
    /// Beyond this distance from the planned window a punch is out-of-window.
    pub out_of_window_min: i32,
    /// Realized-over-planned excess at or under this is not overtime.
    pub overtime_tolerance_min: i32,
    /// Overtime at or under this auto-qualifies; beyond needs approval.
    pub overtime_auto_ceiling_min: i32,
    /// Consecutive refusals that trigger an HR escalation.
    pub refusal_escalation_threshold: i32,
}

impl Default for ReconThresholds {
    fn default() -> Self {
        Self {
            late_grace_min: 5,
            late_attention_max_min: 30,
            depart_grace_min: 5,
            depart_attention_max_min: 30,
            out_of_window_min: 45,
            overtime_tolerance_min: 15,
            overtime_auto_ceiling_min: 45,
            refusal_escalation_threshold: 5,
        }
    }
}

impl ReconThresholds {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            late_grace_min: env_or("LATE_GRACE_MIN", d.late_grace_min),
            late_attention_max_min: env_or("LATE_ATTENTION_MAX_MIN", d.late_attention_max_min),
            depart_grace_min: env_or("DEPART_GRACE_MIN", d.depart_grace_min),
            depart_attention_max_min: env_or(
                "DEPART_ATTENTION_MAX_MIN",
                d.depart_attention_max_min,
            ),
            out_of_window_min: env_or("OUT_OF_WINDOW_MIN", d.out_of_window_min),
            overtime_tolerance_min: env_or("OVERTIME_TOLERANCE_MIN", d.overtime_tolerance_min),
            overtime_auto_ceiling_min: env_or(
                "OVERTIME_AUTO_CEILING_MIN",
                d.overtime_auto_ceiling_min,
            ),
            refusal_escalation_threshold: env_or(
                "REFUSAL_ESCALATION_THRESHOLD",
                d.refusal_escalation_threshold,
            ),
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub server_addr: String,

    // Rate limiting
    pub rate_read_per_min: u32,
    pub rate_write_per_min: u32,
    pub rate_recon_per_min: u32,

    pub api_prefix: String,

    pub thresholds: ReconThresholds,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        Self {
            server_addr: env::var("SERVER_ADDR").expect("SERVER_ADDR must be set"),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),

            rate_read_per_min: env_or("RATE_READ_PER_MIN", 1000),
            rate_write_per_min: env_or("RATE_WRITE_PER_MIN", 300),
            rate_recon_per_min: env_or("RATE_RECON_PER_MIN", 30),

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api/v1".to_string()),

            thresholds: ReconThresholds::from_env(),
        }
    }
}
