#![deny(warnings)]
pub mod model;
pub mod rules;
pub mod snapshot;

pub struct EngineInfo;

impl EngineInfo {
    pub const fn name() -> &'static str {
        "recall"
    }

    pub const fn codename() -> &'static str {
        "Dutch"
    }

    pub const fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }
}

#[cfg(test)]
mod tests {
    use super::EngineInfo;

    #[test]
    fn exposes_static_metadata() {
        assert_eq!(EngineInfo::name(), "recall");
        assert_eq!(EngineInfo::codename(), "Dutch");
        assert!(!EngineInfo::version().is_empty());
    }
}
