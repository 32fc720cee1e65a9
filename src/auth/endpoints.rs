use crate::types::Domain;

/// URL endpoints for Apple iCloud account services.
/// Supports both "com" (international) and "cn" (China) domains.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub home: String,
    pub setup: String,
}

impl Endpoints {
    pub fn for_domain(domain: Domain) -> Self {
        match domain {
            Domain::Com => Self {
                home: "https://www.icloud.com".into(),
                setup: "https://setup.icloud.com/setup/ws/1".into(),
            },
            Domain::Cn => Self {
                home: "https://www.icloud.com.cn".into(),
                setup: "https://setup.icloud.com.cn/setup/ws/1".into(),
            },
        }
    }

    /// Endpoints rooted at an arbitrary base, e.g. a mock server.
    #[cfg(test)]
    pub fn with_base(base: &str) -> Self {
        Self {
            home: base.to_string(),
            setup: format!("{}/setup/ws/1", base),
        }
    }

    pub fn login(&self) -> String {
        format!("{}/login", self.setup)
    }
}
