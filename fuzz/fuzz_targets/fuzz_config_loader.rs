#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse and validation errors are fine; panics are not.
    let Ok(cfg) = toml::from_str::<mcs_config::Config>(data) else {
        return;
    };
    if cfg.validate().is_ok() {
        // Anything that validates must also build a loop config.
        let _ = mcs_core::LoopCfg::from(&cfg);
    }
});
