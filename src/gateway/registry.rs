//! Bank address registry (`bankName -> networkAddress`).

use dashmap::DashMap;
use tracing::info;

#[derive(Debug, Default)]
pub struct BankRegistry {
    banks: DashMap<String, String>,
}

impl BankRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite. Returns the previous address.
    pub fn register(&self, bank_name: impl Into<String>, address: impl Into<String>) -> Option<String> {
        let bank_name = bank_name.into();
        let address = address.into();
        info!(bank = %bank_name, address = %address, "Bank registered");
        self.banks.insert(bank_name, address)
    }

    pub fn resolve(&self, bank_name: &str) -> Option<String> {
        self.banks.get(bank_name).map(|a| a.value().clone())
    }

    pub fn len(&self) -> usize {
        self.banks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.banks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_overwrites() {
        let registry = BankRegistry::new();
        assert_eq!(registry.register("BankA", "localhost:50052"), None);
        assert_eq!(
            registry.register("BankA", "localhost:60052").as_deref(),
            Some("localhost:50052")
        );
        assert_eq!(registry.resolve("BankA").as_deref(), Some("localhost:60052"));
        assert_eq!(registry.resolve("BankB"), None);
        assert_eq!(registry.len(), 1);
    }
}
