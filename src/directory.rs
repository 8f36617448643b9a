use chrono::{DateTime, Utc};
use tracing::debug;

use crate::aws::{AwsError, InstanceRecord, Inventory, PingStatus, SessionBroker};

/// Everything the menu shows about one instance. Rebuilt on every run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceSummary {
    pub id: String,
    /// Value of the `Name` tag.
    pub name: Option<String>,
    pub uptime: String,
    pub image_id: Option<String>,
    pub instance_type: Option<String>,
    pub private_ip: Option<String>,
    pub state: Option<String>,
    pub vpc_id: Option<String>,
    pub subnet_id: Option<String>,
    pub tags: Vec<(String, String)>,
}

impl InstanceSummary {
    fn from_record(record: InstanceRecord, now: DateTime<Utc>) -> Self {
        let name = record
            .tags
            .iter()
            .find(|(key, _)| key == "Name")
            .map(|(_, value)| value.clone());
        let uptime = match record.launch_time {
            Some(launched) => format_uptime(now - launched),
            None => String::new(),
        };
        Self {
            id: record.instance_id,
            name,
            uptime,
            image_id: record.image_id,
            instance_type: record.instance_type,
            private_ip: record.private_ip,
            state: record.state,
            vpc_id: record.vpc_id,
            subnet_id: record.subnet_id,
            tags: record.tags,
        }
    }

    /// Name for list rows, `-` when the instance is untagged.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("-")
    }
}

/// Ids of instances whose agent currently reports `Online`.
pub fn list_reachable_instances<B>(broker: &B) -> Result<Vec<String>, AwsError>
where
    B: SessionBroker + ?Sized,
{
    let agents = broker.describe_instance_information()?;
    let total = agents.len();
    let mut ids: Vec<String> = Vec::with_capacity(total);
    for agent in agents {
        if agent.ping_status == PingStatus::Online && !ids.contains(&agent.instance_id) {
            ids.push(agent.instance_id);
        }
    }
    debug!(online = ids.len(), total, "filtered managed instances");
    Ok(ids)
}

/// Look up `ids` in EC2 and return one summary per id, in the order given.
///
/// Ids EC2 doesn't know about are dropped, and so are non-EC2 managed nodes
/// (`mi-...`), which EC2 rejects outright. An empty `ids` never reaches EC2,
/// since an unfiltered DescribeInstances returns the whole account.
pub fn describe<I>(
    inventory: &I,
    ids: &[String],
    now: DateTime<Utc>,
) -> Result<Vec<InstanceSummary>, AwsError>
where
    I: Inventory + ?Sized,
{
    let ec2_ids: Vec<String> = ids
        .iter()
        .filter(|id| id.starts_with("i-"))
        .cloned()
        .collect();
    if ec2_ids.len() < ids.len() {
        debug!(
            skipped = ids.len() - ec2_ids.len(),
            "skipping managed nodes that are not EC2 instances"
        );
    }
    if ec2_ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut records = inventory.describe_instances(&ec2_ids)?;

    let mut summaries = Vec::with_capacity(ec2_ids.len());
    for id in &ec2_ids {
        if let Some(pos) = records.iter().position(|r| &r.instance_id == id) {
            let record = records.swap_remove(pos);
            summaries.push(InstanceSummary::from_record(record, now));
        }
    }
    Ok(summaries)
}

/// Format elapsed time as "D days, H hours, M minutes", or "H hours, M minutes"
/// when under a day. Negative durations (clock skew) count as zero.
pub fn format_uptime(elapsed: chrono::Duration) -> String {
    let total_minutes = elapsed.num_minutes().max(0);
    let days = total_minutes / (24 * 60);
    let hours = (total_minutes / 60) % 24;
    let minutes = total_minutes % 60;

    if days > 0 {
        format!(
            "{}, {}, {}",
            unit(days, "day"),
            unit(hours, "hour"),
            unit(minutes, "minute")
        )
    } else {
        format!("{}, {}", unit(hours, "hour"), unit(minutes, "minute"))
    }
}

fn unit(value: i64, name: &str) -> String {
    format!("{} {}{}", value, name, if value == 1 { "" } else { "s" })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::{AgentStatus, SessionDocument, SessionHandle};
    use chrono::{Duration, TimeZone};
    use std::cell::RefCell;

    struct FakeBroker {
        agents: Vec<AgentStatus>,
    }

    impl SessionBroker for FakeBroker {
        fn describe_instance_information(&self) -> Result<Vec<AgentStatus>, AwsError> {
            Ok(self.agents.clone())
        }
        fn start_session(
            &self,
            _instance_id: &str,
            _document: SessionDocument,
        ) -> Result<SessionHandle, AwsError> {
            unreachable!("directory never opens sessions")
        }
        fn terminate_session(&self, _session_id: &str) -> Result<(), AwsError> {
            unreachable!("directory never closes sessions")
        }
    }

    struct FakeInventory {
        records: Vec<InstanceRecord>,
        calls: RefCell<Vec<Vec<String>>>,
    }

    impl Inventory for FakeInventory {
        fn describe_instances(&self, ids: &[String]) -> Result<Vec<InstanceRecord>, AwsError> {
            self.calls.borrow_mut().push(ids.to_vec());
            if let Some(bad) = ids.iter().find(|id| !id.starts_with("i-")) {
                return Err(AwsError::service(
                    "DescribeInstances",
                    Some("InvalidInstanceID.Malformed"),
                    format!("Invalid id: \"{}\"", bad),
                ));
            }
            Ok(self
                .records
                .iter()
                .filter(|r| ids.contains(&r.instance_id))
                .cloned()
                .collect())
        }
    }

    fn agent(id: &str, status: PingStatus) -> AgentStatus {
        AgentStatus {
            instance_id: id.to_string(),
            ping_status: status,
        }
    }

    fn record(id: &str, name: Option<&str>, launched: DateTime<Utc>) -> InstanceRecord {
        let mut tags = vec![("env".to_string(), "prod".to_string())];
        if let Some(name) = name {
            tags.push(("Name".to_string(), name.to_string()));
        }
        InstanceRecord {
            instance_id: id.to_string(),
            launch_time: Some(launched),
            image_id: Some("ami-123".to_string()),
            instance_type: Some("t3.micro".to_string()),
            private_ip: Some("10.0.0.5".to_string()),
            state: Some("running".to_string()),
            vpc_id: Some("vpc-1".to_string()),
            subnet_id: Some("subnet-1".to_string()),
            tags,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_uptime_over_a_day() {
        let elapsed = Duration::hours(25) + Duration::minutes(3);
        assert_eq!(format_uptime(elapsed), "1 day, 1 hour, 3 minutes");
    }

    #[test]
    fn test_uptime_under_an_hour() {
        assert_eq!(format_uptime(Duration::minutes(45)), "0 hours, 45 minutes");
    }

    #[test]
    fn test_uptime_plurals() {
        assert_eq!(
            format_uptime(Duration::days(2) + Duration::minutes(1)),
            "2 days, 0 hours, 1 minute"
        );
        assert_eq!(format_uptime(Duration::hours(1)), "1 hour, 0 minutes");
    }

    #[test]
    fn test_uptime_ignores_seconds_and_skew() {
        assert_eq!(format_uptime(Duration::seconds(59)), "0 hours, 0 minutes");
        assert_eq!(format_uptime(Duration::minutes(-5)), "0 hours, 0 minutes");
    }

    #[test]
    fn test_only_online_instances_listed() {
        let broker = FakeBroker {
            agents: vec![
                agent("i-1", PingStatus::Online),
                agent("i-2", PingStatus::ConnectionLost),
                agent("i-3", PingStatus::Online),
                agent("i-4", PingStatus::Inactive),
                agent("i-1", PingStatus::Online),
            ],
        };
        let ids = list_reachable_instances(&broker).unwrap();
        assert_eq!(ids, vec!["i-1", "i-3"]);
    }

    #[test]
    fn test_describe_one_summary_per_id_in_order() {
        let inventory = FakeInventory {
            records: vec![
                record("i-2", None, now() - Duration::minutes(45)),
                record("i-1", Some("web-1"), now() - Duration::hours(25) - Duration::minutes(3)),
            ],
            calls: RefCell::new(Vec::new()),
        };
        let ids = vec!["i-1".to_string(), "i-2".to_string()];
        let summaries = describe(&inventory, &ids, now()).unwrap();

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].id, "i-1");
        assert_eq!(summaries[0].name.as_deref(), Some("web-1"));
        assert_eq!(summaries[0].uptime, "1 day, 1 hour, 3 minutes");
        assert_eq!(summaries[0].instance_type.as_deref(), Some("t3.micro"));
        assert_eq!(summaries[0].vpc_id.as_deref(), Some("vpc-1"));
        assert_eq!(summaries[1].id, "i-2");
        assert_eq!(summaries[1].name, None);
        assert_eq!(summaries[1].display_name(), "-");
        assert_eq!(summaries[1].uptime, "0 hours, 45 minutes");
        assert_eq!(inventory.calls.borrow().len(), 1);
    }

    #[test]
    fn test_describe_empty_ids_skips_inventory() {
        let inventory = FakeInventory {
            records: vec![record("i-1", None, now())],
            calls: RefCell::new(Vec::new()),
        };
        let summaries = describe(&inventory, &[], now()).unwrap();
        assert!(summaries.is_empty());
        assert!(inventory.calls.borrow().is_empty());
    }

    #[test]
    fn test_describe_missing_launch_time() {
        let mut rec = record("i-9", Some("db"), now());
        rec.launch_time = None;
        let inventory = FakeInventory {
            records: vec![rec],
            calls: RefCell::new(Vec::new()),
        };
        let summaries = describe(&inventory, &["i-9".to_string()], now()).unwrap();
        assert_eq!(summaries[0].uptime, "");
    }

    struct FailingBroker;

    impl SessionBroker for FailingBroker {
        fn describe_instance_information(&self) -> Result<Vec<AgentStatus>, AwsError> {
            Err(AwsError::service(
                "DescribeInstanceInformation",
                Some("AccessDeniedException"),
                "not authorized",
            ))
        }
        fn start_session(
            &self,
            _instance_id: &str,
            _document: SessionDocument,
        ) -> Result<SessionHandle, AwsError> {
            unreachable!("directory never opens sessions")
        }
        fn terminate_session(&self, _session_id: &str) -> Result<(), AwsError> {
            unreachable!("directory never closes sessions")
        }
    }

    struct FailingInventory;

    impl Inventory for FailingInventory {
        fn describe_instances(&self, _ids: &[String]) -> Result<Vec<InstanceRecord>, AwsError> {
            Err(AwsError::service("DescribeInstances", None, "expired token"))
        }
    }

    #[test]
    fn test_broker_error_propagates() {
        let err = list_reachable_instances(&FailingBroker).unwrap_err();
        assert_eq!(err.code(), Some("AccessDeniedException"));
    }

    #[test]
    fn test_inventory_error_propagates() {
        let err = describe(&FailingInventory, &["i-1".to_string()], now()).unwrap_err();
        assert!(matches!(err, AwsError::Service { operation: "DescribeInstances", .. }));
        assert!(err.guidance().is_some());
    }

    #[test]
    fn test_describe_skips_hybrid_nodes() {
        let inventory = FakeInventory {
            records: vec![record("i-1", Some("web-1"), now())],
            calls: RefCell::new(Vec::new()),
        };
        let ids = vec!["mi-0123456789abcdef0".to_string(), "i-1".to_string()];
        let summaries = describe(&inventory, &ids, now()).unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].id, "i-1");
        assert_eq!(*inventory.calls.borrow(), vec![vec!["i-1".to_string()]]);

        let only_hybrid = describe(&inventory, &ids[..1], now()).unwrap();
        assert!(only_hybrid.is_empty());
        assert_eq!(inventory.calls.borrow().len(), 1);
    }
}
