use std::fmt;

/// Physical join strategies, in the order the planner evaluates them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinStrategy {
    Product,
    Nested,
    Index,
    Hash,
    Merge,
}

impl JoinStrategy {
    pub const ALL: [JoinStrategy; 5] = [
        JoinStrategy::Product,
        JoinStrategy::Nested,
        JoinStrategy::Index,
        JoinStrategy::Hash,
        JoinStrategy::Merge,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            JoinStrategy::Product => "product",
            JoinStrategy::Nested => "nested",
            JoinStrategy::Index => "index",
            JoinStrategy::Hash => "hash",
            JoinStrategy::Merge => "merge",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.to_lowercase();
        JoinStrategy::ALL.iter().copied().find(|s| s.name() == name)
    }
}

impl fmt::Display for JoinStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Estimated block accesses of each join candidate. `None` marks a strategy
/// that does not apply to the join at hand.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CostTable {
    entries: Vec<(JoinStrategy, Option<usize>)>,
}

impl CostTable {
    pub fn new() -> Self {
        CostTable::default()
    }

    pub fn record(&mut self, strategy: JoinStrategy, cost: Option<usize>) {
        self.entries.push((strategy, cost));
    }

    pub fn cost(&self, strategy: JoinStrategy) -> Option<usize> {
        self.entries
            .iter()
            .find(|(s, _)| *s == strategy)
            .and_then(|(_, c)| *c)
    }

    pub fn entries(&self) -> &[(JoinStrategy, Option<usize>)] {
        &self.entries
    }

    pub fn choose_cheapest(&self) -> Option<JoinStrategy> {
        choose_cheapest(&self.entries)
    }
}

impl fmt::Display for CostTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (strategy, cost) in &self.entries {
            match cost {
                Some(c) => writeln!(f, "  {:<8}{}", strategy.name(), c)?,
                None => writeln!(f, "  {:<8}n/a", strategy.name())?,
            }
        }
        Ok(())
    }
}

/// The applicable strategy with the strictly lowest cost. On a tie the
/// entry listed first wins.
pub fn choose_cheapest(costs: &[(JoinStrategy, Option<usize>)]) -> Option<JoinStrategy> {
    let mut best: Option<(JoinStrategy, usize)> = None;
    for (strategy, cost) in costs {
        if let Some(c) = cost {
            match best {
                Some((_, b)) if b <= *c => {}
                _ => best = Some((*strategy, *c)),
            }
        }
    }
    best.map(|(s, _)| s)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_cheapest_wins() {
        let mut costs = CostTable::new();
        costs.record(JoinStrategy::Product, Some(100));
        costs.record(JoinStrategy::Nested, Some(80));
        costs.record(JoinStrategy::Index, None);
        costs.record(JoinStrategy::Hash, Some(40));
        costs.record(JoinStrategy::Merge, Some(60));
        assert_eq!(Some(JoinStrategy::Hash), costs.choose_cheapest());
        assert_eq!(None, costs.cost(JoinStrategy::Index));
        assert_eq!(Some(60), costs.cost(JoinStrategy::Merge));
        assert!(costs.to_string().contains("index   n/a"));
    }

    #[test]
    fn test_ties_keep_first() {
        let costs = vec![
            (JoinStrategy::Product, Some(10)),
            (JoinStrategy::Nested, Some(10)),
            (JoinStrategy::Hash, Some(10)),
        ];
        assert_eq!(Some(JoinStrategy::Product), choose_cheapest(&costs));
        assert_eq!(None, choose_cheapest(&[(JoinStrategy::Index, None)]));
    }

    #[test]
    fn test_names() {
        for s in JoinStrategy::ALL.iter() {
            assert_eq!(Some(*s), JoinStrategy::from_name(&s.to_string()));
        }
        assert_eq!(Some(JoinStrategy::Merge), JoinStrategy::from_name("MERGE"));
        assert_eq!(None, JoinStrategy::from_name("sideways"));
    }
}
