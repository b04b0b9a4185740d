use crate::types::{CoinFormat, MetricSpec, Rule, Source};

/// The metrics shown in the stats category, in update order.
pub fn default_metrics() -> Vec<MetricSpec> {
    let info = || Source::node("get_info");

    vec![
        MetricSpec::new("Network:", info(), Some("network"), vec![]),
        MetricSpec::new("Block Time:", info(), Some("average_block_time"), vec![Rule::Seconds]),
        MetricSpec::new(
            "Block Reward:",
            info(),
            Some("block_reward"),
            vec![Rule::Coins(CoinFormat::Reward)],
        ),
        MetricSpec::new(
            "Max Supply:",
            info(),
            Some("maximum_supply"),
            vec![Rule::Coins(CoinFormat::Millions)],
        ),
        MetricSpec::new(
            "Circ Supply:",
            info(),
            Some("circulating_supply"),
            vec![Rule::Coins(CoinFormat::Whole)],
        ),
        MetricSpec::new("Net Hash:", Source::node("get_difficulty"), Some("hashrate_formatted"), vec![]),
        MetricSpec::new(
            "Coins Mined:",
            info(),
            Some("circulating_supply"),
            vec![Rule::PercentOfMax {
                max_key: "maximum_supply".to_string(),
            }],
        ),
        MetricSpec::new("Price:", Source::Price, None, vec![Rule::Currency]),
        MetricSpec::new("Mcap:", info(), Some("circulating_supply"), vec![Rule::MarketCap]),
    ]
}
