//! Messages a run delivers to its consumer.
//!
//! Zero or more [`RunMessage::Progress`] messages, then exactly one terminal
//! [`RunMessage::Result`] or [`RunMessage::Error`].

use insight_core::models::AggregationResult;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RunMessage {
    /// Completion percentage in `[0, 100]`.
    Progress { percent: u8 },
    /// Final aggregates of a successful run. Serialised with both the
    /// `countryCustomerCounts` map and the encounter-ordered `countries` list.
    #[serde(serialize_with = "serialize_result")]
    Result(AggregationResult),
    /// The run failed; no partial result follows.
    Error { message: String },
}

impl RunMessage {
    /// `true` for the message that ends a run.
    pub fn is_terminal(&self) -> bool {
        match self {
            RunMessage::Progress { .. } => false,
            RunMessage::Result(_) | RunMessage::Error { .. } => true,
        }
    }
}

fn serialize_result<S: Serializer>(
    result: &AggregationResult,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(4))?;
    map.serialize_entry("countryCustomerCounts", &result.country_customer_counts())?;
    map.serialize_entry("countries", &result.countries)?;
    map.serialize_entry("dateCounts", &result.date_counts)?;
    map.serialize_entry("rowsProcessed", &result.rows_processed)?;
    map.end()
}

#[cfg(test)]
mod tests {
    use super::*;
    use insight_core::models::CountryCount;

    #[test]
    fn test_terminal_messages() {
        assert!(!RunMessage::Progress { percent: 40 }.is_terminal());
        assert!(RunMessage::Result(AggregationResult::default()).is_terminal());
        assert!(RunMessage::Error { message: "boom".to_string() }.is_terminal());
    }

    #[test]
    fn test_wire_shape() {
        let progress = serde_json::to_value(RunMessage::Progress { percent: 35 }).unwrap();
        assert_eq!(progress, serde_json::json!({ "type": "progress", "percent": 35 }));

        let result = serde_json::to_value(RunMessage::Result(AggregationResult::default())).unwrap();
        assert_eq!(result["type"], "result");
        assert!(result.get("dateCounts").is_some());

        let error = serde_json::to_value(RunMessage::Error { message: "bad".to_string() }).unwrap();
        assert_eq!(error["message"], "bad");
    }

    #[test]
    fn test_result_carries_country_customer_counts() {
        let result = AggregationResult {
            countries: vec![
                CountryCount { country: "Norway".to_string(), customers: 10 },
                CountryCount { country: "Australia".to_string(), customers: 9 },
            ],
            date_counts: [("2011-05-03".to_string(), 4)].into_iter().collect(),
            rows_processed: 12,
        };
        let json = serde_json::to_value(RunMessage::Result(result)).unwrap();

        assert_eq!(json["type"], "result");
        assert_eq!(json["countryCustomerCounts"]["Norway"], 10);
        assert_eq!(json["countryCustomerCounts"]["Australia"], 9);
        assert_eq!(json["countries"][0]["country"], "Norway");
        assert_eq!(json["dateCounts"]["2011-05-03"], 4);
        assert_eq!(json["rowsProcessed"], 12);
    }
}
