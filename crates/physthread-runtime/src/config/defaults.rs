//! Compile-time pool defaults (generated by build.rs, see `PHYS_CONFIG_RS`)

include!(concat!(env!("OUT_DIR"), "/phys_merged_config.rs"));
