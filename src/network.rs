use std::collections::HashMap;

const KNOWN_NETWORKS: &[(u64, &str)] = &[
    (1, "Ethereum Mainnet"),
    (11155111, "Sepolia Testnet"),
    (10, "Optimism"),
    (137, "Polygon"),
    (42161, "Arbitrum One"),
    (56, "BNB Smart Chain"),
    (8453, "Base"),
    (43114, "Avalanche C-Chain"),
    (100, "Gnosis Chain"),
];

/// Chain id to human readable network label.
///
/// Handed to each analysis component at construction; unknown ids get a
/// generated label instead of an error.
#[derive(Debug, Clone)]
pub struct NetworkNames {
    names: HashMap<u64, String>,
}

impl Default for NetworkNames {
    fn default() -> Self {
        Self::from_pairs(KNOWN_NETWORKS.iter().map(|(id, name)| (*id, name.to_string())))
    }
}

impl NetworkNames {
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (u64, String)>,
    {
        Self {
            names: pairs.into_iter().collect(),
        }
    }

    pub fn with_network(mut self, chain_id: u64, name: impl Into<String>) -> Self {
        self.names.insert(chain_id, name.into());
        self
    }

    pub fn label(&self, chain_id: u64) -> String {
        self.names
            .get(&chain_id)
            .cloned()
            .unwrap_or_else(|| format!("Unknown (chain ID {})", chain_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_ids_resolve() {
        let names = NetworkNames::default();
        assert_eq!(names.label(1), "Ethereum Mainnet");
        assert_eq!(names.label(8453), "Base");
    }

    #[test]
    fn unknown_id_gets_generated_label() {
        let names = NetworkNames::default();
        assert_eq!(names.label(31337), "Unknown (chain ID 31337)");
    }

    #[test]
    fn injected_entries_override_defaults() {
        let names = NetworkNames::default().with_network(31337, "Anvil");
        assert_eq!(names.label(31337), "Anvil");
    }
}
