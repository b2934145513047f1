//! Config namespace: layered YAML runtime settings.

mod settings;

pub use settings::{
    DEFAULT_BIND_ADDR, DriverSettings, GatewaySettings, JobSettings, RuntimeSettings,
    load_runtime_settings, load_runtime_settings_from_paths, runtime_settings_paths,
    set_config_home_override,
};
