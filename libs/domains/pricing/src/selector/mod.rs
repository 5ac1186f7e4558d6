//! Recommendation selection
//!
//! A selector picks a few plans out of the candidates a request produced.
//! Plans are ranked by value, `(cpu + ram_gb) / price_monthly`.

mod delegated;

pub use delegated::{DelegatedSelector, extract_json_object};

use async_trait::async_trait;
use core_config::ConfigError;
use std::cmp::Ordering;
use std::sync::Arc;

use crate::config::{PricingConfig, SelectionPolicy};
use crate::models::{CloudPlan, CloudProvider};

/// Plans returned by [`TopScoreSelector`]
pub const TOP_N: usize = 4;

#[async_trait]
pub trait PlanSelector: Send + Sync {
    fn policy(&self) -> SelectionPolicy;

    /// Recommended subset of `plans`. Never fails; may be empty.
    async fn select(&self, plans: &[CloudPlan], custom_prompt: Option<&str>) -> Vec<CloudPlan>;
}

/// Highest-scoring plan of each provider, best first.
#[derive(Debug, Clone, Copy, Default)]
pub struct BestPerProviderSelector;

#[async_trait]
impl PlanSelector for BestPerProviderSelector {
    fn policy(&self) -> SelectionPolicy {
        SelectionPolicy::PerProvider
    }

    async fn select(&self, plans: &[CloudPlan], _custom_prompt: Option<&str>) -> Vec<CloudPlan> {
        best_per_provider(plans)
    }
}

/// Global top [`TOP_N`] plans by score.
#[derive(Debug, Clone, Copy, Default)]
pub struct TopScoreSelector;

#[async_trait]
impl PlanSelector for TopScoreSelector {
    fn policy(&self) -> SelectionPolicy {
        SelectionPolicy::Top
    }

    async fn select(&self, plans: &[CloudPlan], _custom_prompt: Option<&str>) -> Vec<CloudPlan> {
        top_by_score(plans, TOP_N)
    }
}

/// One winner per provider (first wins ties), then sorted by score
/// descending. The sort is stable so equal scores keep provider
/// first-appearance order.
pub fn best_per_provider(plans: &[CloudPlan]) -> Vec<CloudPlan> {
    let mut winners: Vec<CloudPlan> = group_by_provider(plans)
        .into_iter()
        .filter_map(|(_, group)| {
            group
                .into_iter()
                .reduce(|best, plan| if plan.score() > best.score() { plan } else { best })
                .cloned()
        })
        .collect();

    winners.sort_by(by_score_desc);
    winners
}

/// First `n` plans by score descending; ties keep input order.
pub fn top_by_score(plans: &[CloudPlan], n: usize) -> Vec<CloudPlan> {
    let mut ranked = plans.to_vec();
    ranked.sort_by(by_score_desc);
    ranked.truncate(n);
    ranked
}

/// Plans grouped by provider, groups in order of first appearance.
pub(crate) fn group_by_provider(plans: &[CloudPlan]) -> Vec<(CloudProvider, Vec<&CloudPlan>)> {
    let mut groups: Vec<(CloudProvider, Vec<&CloudPlan>)> = Vec::new();
    for plan in plans {
        match groups.iter_mut().find(|(provider, _)| *provider == plan.provider) {
            Some((_, group)) => group.push(plan),
            None => groups.push((plan.provider, vec![plan])),
        }
    }
    groups
}

fn by_score_desc(a: &CloudPlan, b: &CloudPlan) -> Ordering {
    b.score().total_cmp(&a.score())
}

/// Selector for the configured policy.
pub fn selector_from_config(
    config: &PricingConfig,
    client: reqwest::Client,
) -> Result<Arc<dyn PlanSelector>, ConfigError> {
    Ok(match config.selection {
        SelectionPolicy::PerProvider => Arc::new(BestPerProviderSelector),
        SelectionPolicy::Top => Arc::new(TopScoreSelector),
        SelectionPolicy::Llm => {
            let llm = config
                .llm
                .clone()
                .ok_or_else(|| ConfigError::MissingEnvVar("LLM_API_URL".to_string()))?;
            Arc::new(DelegatedSelector::new(llm, client))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(provider: CloudProvider, name: &str, cpu: i32, ram_gb: f64, price_monthly: f64) -> CloudPlan {
        CloudPlan::vm(provider, name, "r1", cpu, ram_gb, price_monthly / 730.0, price_monthly)
    }

    fn names(plans: &[CloudPlan]) -> Vec<&str> {
        plans.iter().map(|p| p.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_best_per_provider_picks_highest_score() {
        let plans = vec![
            plan(CloudProvider::Aws, "small", 2, 4.0, 20.0), // 0.3
            plan(CloudProvider::Aws, "large", 4, 8.0, 30.0), // 0.4
        ];

        let picked = BestPerProviderSelector.select(&plans, None).await;
        assert_eq!(names(&picked), vec!["large"]);
    }

    #[tokio::test]
    async fn test_best_per_provider_one_per_provider_sorted_by_score() {
        let plans = vec![
            plan(CloudProvider::Aws, "aws-a", 2, 4.0, 60.0),       // 0.1
            plan(CloudProvider::Hetzner, "hz-a", 2, 4.0, 6.0),     // 1.0
            plan(CloudProvider::Aws, "aws-b", 2, 4.0, 30.0),       // 0.2
            plan(CloudProvider::Scaleway, "scw-a", 2, 2.0, 8.0),   // 0.5
            plan(CloudProvider::Hetzner, "hz-b", 2, 4.0, 12.0),    // 0.5
        ];

        let picked = best_per_provider(&plans);
        assert_eq!(names(&picked), vec!["hz-a", "scw-a", "aws-b"]);

        let mut providers: Vec<_> = picked.iter().map(|p| p.provider).collect();
        providers.dedup();
        assert_eq!(providers.len(), picked.len());
    }

    #[test]
    fn test_best_per_provider_ties_keep_first() {
        let plans = vec![
            plan(CloudProvider::Hetzner, "first", 2, 4.0, 12.0),
            plan(CloudProvider::Hetzner, "second", 2, 4.0, 12.0),
            plan(CloudProvider::Aws, "aws", 2, 4.0, 12.0),
        ];

        assert_eq!(names(&best_per_provider(&plans)), vec!["first", "aws"]);
    }

    #[tokio::test]
    async fn test_top_score_returns_at_most_four_sorted() {
        let plans: Vec<CloudPlan> = (1..=6)
            .map(|i| plan(CloudProvider::Aws, &format!("p{i}"), i, 2.0, 10.0))
            .collect();

        let picked = TopScoreSelector.select(&plans, None).await;
        assert_eq!(names(&picked), vec!["p6", "p5", "p4", "p3"]);
        assert!(picked.windows(2).all(|w| w[0].score() >= w[1].score()));

        let few = TopScoreSelector.select(&plans[..2], None).await;
        assert_eq!(few.len(), 2);
    }

    #[test]
    fn test_selection_is_deterministic() {
        let plans = vec![
            plan(CloudProvider::Aws, "a", 2, 4.0, 12.0),
            plan(CloudProvider::Azure, "b", 2, 4.0, 12.0),
            plan(CloudProvider::Hetzner, "c", 2, 4.0, 12.0),
        ];

        assert_eq!(best_per_provider(&plans), best_per_provider(&plans));
        assert_eq!(names(&top_by_score(&plans, TOP_N)), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(best_per_provider(&[]).is_empty());
        assert!(top_by_score(&[], TOP_N).is_empty());
    }

    #[test]
    fn test_selector_from_config() {
        let client = reqwest::Client::new();
        let mut config = PricingConfig::default();
        assert_eq!(
            selector_from_config(&config, client.clone()).unwrap().policy(),
            SelectionPolicy::PerProvider
        );

        config.selection = SelectionPolicy::Top;
        assert_eq!(
            selector_from_config(&config, client.clone()).unwrap().policy(),
            SelectionPolicy::Top
        );

        config.selection = SelectionPolicy::Llm;
        assert!(selector_from_config(&config, client).is_err());
    }
}
