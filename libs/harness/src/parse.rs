//! Parsers for command output and route responses.

use std::collections::BTreeMap;

use pat_converge::OperationStatus;

/// Cookie the router uses to pin a session to one app instance.
pub const VCAP_ID: &str = "__VCAP_ID__";

/// Fields of `service <name>` output.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServiceInstanceDetails {
    pub name: Option<String>,
    pub service: Option<String>,
    pub plan: Option<String>,
    pub status: Option<OperationStatus>,
}

impl ServiceInstanceDetails {
    pub fn parse(text: &str) -> Self {
        Self {
            name: labelled(text, "Service instance:"),
            service: labelled(text, "Service:"),
            plan: labelled(text, "Plan:"),
            status: OperationStatus::from_cli_text(text),
        }
    }
}

fn labelled(text: &str, label: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix(label))
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Instance table of `app <name>` output: index to state.
///
/// ```text
///      state     since                    cpu    memory
/// #0   running   2015-06-01 10:00:00 AM   0.0%   20M of 256M
/// ```
pub fn app_instances(text: &str) -> BTreeMap<u32, String> {
    text.lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let index = fields.next()?.strip_prefix('#')?.parse().ok()?;
            let state = fields.next()?;
            Some((index, state.to_string()))
        })
        .collect()
}

/// Number of instances in the given state.
pub fn instances_in_state(text: &str, state: &str) -> usize {
    app_instances(text).values().filter(|s| *s == state).count()
}

/// Instance index from a body such as `Hello, web at index: 2!`.
pub fn instance_index(body: &str) -> Option<u32> {
    let (_, rest) = body.rsplit_once("index: ")?;
    let digits = rest.split('!').next()?.trim();
    digits.parse().ok()
}

/// Session-affinity cookie value from a `Set-Cookie` header.
pub fn vcap_id(header: &str) -> Option<String> {
    let (_, rest) = header.rsplit_once(&format!("{VCAP_ID}="))?;
    let value = rest.split(';').next()?.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Access level of one plan in a `service-access` listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    All,
    Limited,
    None,
}

/// One row of a `service-access` listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceAccessRow {
    pub service: String,
    pub plan: String,
    pub access: Access,
    pub orgs: Vec<String>,
}

/// Rows of `service-access` output. Header and broker lines are skipped.
pub fn service_access(text: &str) -> Vec<ServiceAccessRow> {
    text.lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 3 {
                return None;
            }
            let access = match fields[2] {
                "all" => Access::All,
                "limited" => Access::Limited,
                "none" => Access::None,
                _ => return None,
            };
            let orgs = fields[3..]
                .iter()
                .flat_map(|field| field.split(','))
                .filter(|org| !org.is_empty())
                .map(str::to_string)
                .collect();
            Some(ServiceAccessRow {
                service: fields[0].to_string(),
                plan: fields[1].to_string(),
                access,
                orgs,
            })
        })
        .collect()
}
