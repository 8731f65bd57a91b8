// 🔮 Category Oracle - Historical and automatic category suggestions
// Lookups go through a per-run cache so each business name is resolved once

use std::collections::HashMap;

/// External category source.
pub trait CategoryOracle {
    /// Category the user most often assigned to this business.
    fn most_frequent_category(&self, business_name: &str, user_id: Option<&str>) -> Option<String>;

    /// Category inferred from the transaction itself.
    fn auto_category(
        &self,
        business_name: &str,
        amount: f64,
        format_name: &str,
        user_id: Option<&str>,
    ) -> Option<String>;
}

impl<T: CategoryOracle + ?Sized> CategoryOracle for &T {
    fn most_frequent_category(&self, business_name: &str, user_id: Option<&str>) -> Option<String> {
        (**self).most_frequent_category(business_name, user_id)
    }

    fn auto_category(
        &self,
        business_name: &str,
        amount: f64,
        format_name: &str,
        user_id: Option<&str>,
    ) -> Option<String> {
        (**self).auto_category(business_name, amount, format_name, user_id)
    }
}

/// Never suggests anything; profile defaults apply.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCategoryOracle;

impl CategoryOracle for NoCategoryOracle {
    fn most_frequent_category(&self, _business_name: &str, _user_id: Option<&str>) -> Option<String> {
        None
    }

    fn auto_category(&self, _: &str, _: f64, _: &str, _: Option<&str>) -> Option<String> {
        None
    }
}

/// History from one source, automatic suggestions from another.
pub struct LayeredOracle<H, A> {
    history: H,
    auto: A,
}

impl<H: CategoryOracle, A: CategoryOracle> LayeredOracle<H, A> {
    pub fn new(history: H, auto: A) -> Self {
        LayeredOracle { history, auto }
    }
}

impl<H: CategoryOracle, A: CategoryOracle> CategoryOracle for LayeredOracle<H, A> {
    fn most_frequent_category(&self, business_name: &str, user_id: Option<&str>) -> Option<String> {
        self.history.most_frequent_category(business_name, user_id)
    }

    fn auto_category(
        &self,
        business_name: &str,
        amount: f64,
        format_name: &str,
        user_id: Option<&str>,
    ) -> Option<String> {
        self.auto.auto_category(business_name, amount, format_name, user_id)
    }
}

// ============================================================================
// PER-RUN CACHE
// ============================================================================

/// Read-through business name → category cache, discarded with the run.
#[derive(Debug, Default)]
pub struct CategoryCache {
    entries: HashMap<String, Option<String>>,
    oracle_calls: usize,
}

impl CategoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// History first, then automatic. The first row seen for a business
    /// name decides the amount passed to `auto_category`.
    pub fn resolve(
        &mut self,
        oracle: &dyn CategoryOracle,
        business_name: &str,
        amount: f64,
        format_name: &str,
        user_id: Option<&str>,
    ) -> Option<String> {
        let key = business_name.trim().to_lowercase();
        if let Some(cached) = self.entries.get(&key) {
            return cached.clone();
        }

        self.oracle_calls += 1;
        let category = oracle
            .most_frequent_category(business_name, user_id)
            .or_else(|| oracle.auto_category(business_name, amount, format_name, user_id));

        self.entries.insert(key, category.clone());
        category
    }

    /// Unique business names sent to the oracle.
    pub fn oracle_calls(&self) -> usize {
        self.oracle_calls
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct CountingOracle {
        history_calls: Cell<usize>,
        auto_calls: Cell<usize>,
    }

    impl CountingOracle {
        fn new() -> Self {
            CountingOracle {
                history_calls: Cell::new(0),
                auto_calls: Cell::new(0),
            }
        }
    }

    impl CategoryOracle for CountingOracle {
        fn most_frequent_category(&self, business_name: &str, _user_id: Option<&str>) -> Option<String> {
            self.history_calls.set(self.history_calls.get() + 1);
            (business_name == "Supermarket").then(|| "Groceries".to_string())
        }

        fn auto_category(&self, _: &str, amount: f64, _: &str, _: Option<&str>) -> Option<String> {
            self.auto_calls.set(self.auto_calls.get() + 1);
            (amount > 0.0).then(|| "Income".to_string())
        }
    }

    #[test]
    fn test_history_wins_over_auto() {
        let oracle = CountingOracle::new();
        let mut cache = CategoryCache::new();

        let category = cache.resolve(&oracle, "Supermarket", 100.0, "cal", None);
        assert_eq!(category, Some("Groceries".to_string()));
        assert_eq!(oracle.auto_calls.get(), 0);
    }

    #[test]
    fn test_cache_calls_oracle_once_per_business() {
        let oracle = CountingOracle::new();
        let mut cache = CategoryCache::new();

        for _ in 0..5 {
            cache.resolve(&oracle, "Cafe", -10.0, "cal", None);
            cache.resolve(&oracle, "cafe ", -10.0, "cal", None);
        }

        assert_eq!(oracle.history_calls.get(), 1);
        assert_eq!(oracle.auto_calls.get(), 1);
        assert_eq!(cache.oracle_calls(), 1);
    }

    #[test]
    fn test_negative_results_are_cached() {
        let oracle = CountingOracle::new();
        let mut cache = CategoryCache::new();

        assert_eq!(cache.resolve(&oracle, "Unknown", -1.0, "cal", None), None);
        assert_eq!(cache.resolve(&oracle, "Unknown", -1.0, "cal", None), None);
        assert_eq!(oracle.history_calls.get(), 1);
    }

    #[test]
    fn test_layered_oracle_splits_sources() {
        let layered = LayeredOracle::new(NoCategoryOracle, CountingOracle::new());

        assert_eq!(layered.most_frequent_category("Supermarket", None), None);
        assert_eq!(layered.auto_category("Salary", 5000.0, "leumi", None), Some("Income".to_string()));
    }
}
