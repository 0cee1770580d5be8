pub mod api {
    pub const OCTOPUS_API_BASE: &str = "https://api.octopus.energy/v1";
    pub const TIMEOUT_CONSUMPTION_MS: u64 = 30_000;
    pub const TIMEOUT_CONSUMPTION_LABEL: &str = "30 seconds";
}

pub mod limits {
    pub const MIN_PAGE_SIZE: i64 = 1;
    pub const MAX_PAGE_SIZE: i64 = 25_000;
    pub const MPAN_DIGITS: usize = 13;
    pub const MPRN_DIGITS: usize = 10;
}

pub mod env_keys {
    pub const API_KEY: &str = "OCTOPUS_API_KEY";
    pub const ELECTRICITY_MPAN: &str = "ELECTRICITY_MPAN";
    pub const ELECTRICITY_SERIAL_NUMBER: &str = "ELECTRICITY_SERIAL_NUMBER";
    pub const GAS_MPRN: &str = "GAS_MPRN";
    pub const GAS_SERIAL_NUMBER: &str = "GAS_SERIAL_NUMBER";
}

pub mod grouping {
    pub const ALLOWED: &[&str] = &["day", "week", "month", "quarter"];
}
