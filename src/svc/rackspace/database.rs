//! # Database module
//!
//! This module provide cloud databases structures and helpers to interact with
//! the rackspace cloud databases api (v1.0).

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::svc::rackspace::client::{Client, ClientError, RestClient};

// -----------------------------------------------------------------------------
// Constants

pub const DEFAULT_CHARACTER_SET: &str = "utf8";
pub const DEFAULT_COLLATE: &str = "utf8_general_ci";

// -----------------------------------------------------------------------------
// Link structure

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
pub struct Link {
    #[serde(rename = "href")]
    pub href: String,
    #[serde(rename = "rel", default)]
    pub rel: Option<String>,
}

// -----------------------------------------------------------------------------
// Flavor structure

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
pub struct Flavor {
    #[serde(rename = "id")]
    pub id: u64,
    #[serde(rename = "name")]
    pub name: String,
    #[serde(rename = "ram")]
    pub ram: u64,
    #[serde(rename = "links", default)]
    pub links: Vec<Link>,
}

impl Display for Flavor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}) {} ({})", self.id, self.name, self.ram)
    }
}

impl Flavor {
    /// returns the value given as `flavorRef` on instance creation, the self
    /// link when there is one or the bare identifier
    pub fn reference(&self) -> String {
        self.links
            .iter()
            .find(|link| link.rel.as_deref() == Some("self"))
            .map(|link| link.href.to_owned())
            .unwrap_or_else(|| self.id.to_string())
    }
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
pub struct Flavors {
    #[serde(rename = "flavors")]
    pub flavors: Vec<Flavor>,
}

// -----------------------------------------------------------------------------
// Status enum

#[derive(Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Debug)]
#[serde(from = "String", into = "String")]
pub enum Status {
    Build,
    Active,
    Blocked,
    Reboot,
    Resize,
    Shutdown,
    Error,
    Failed,
    Other(String),
}

impl From<String> for Status {
    fn from(s: String) -> Self {
        match s.to_uppercase().as_str() {
            "BUILD" => Self::Build,
            "ACTIVE" => Self::Active,
            "BLOCKED" => Self::Blocked,
            "REBOOT" => Self::Reboot,
            "RESIZE" => Self::Resize,
            "SHUTDOWN" => Self::Shutdown,
            "ERROR" => Self::Error,
            "FAILED" => Self::Failed,
            _ => Self::Other(s),
        }
    }
}

impl From<Status> for String {
    fn from(status: Status) -> Self {
        status.to_string()
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Build => write!(f, "BUILD"),
            Self::Active => write!(f, "ACTIVE"),
            Self::Blocked => write!(f, "BLOCKED"),
            Self::Reboot => write!(f, "REBOOT"),
            Self::Resize => write!(f, "RESIZE"),
            Self::Shutdown => write!(f, "SHUTDOWN"),
            Self::Error => write!(f, "ERROR"),
            Self::Failed => write!(f, "FAILED"),
            Self::Other(s) => write!(f, "{}", s),
        }
    }
}

impl Status {
    /// the instance will never become active on its own
    pub fn is_terminal_failure(&self) -> bool {
        matches!(self, Self::Error | Self::Failed)
    }
}

// -----------------------------------------------------------------------------
// Instance structure

/// identifier of a flavor as referenced by an instance, the api answers with
/// a string here while flavors are listed with numbers
#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
#[serde(untagged)]
pub enum FlavorId {
    Number(u64),
    Text(String),
}

impl Display for FlavorId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(id) => write!(f, "{}", id),
            Self::Text(id) => write!(f, "{}", id),
        }
    }
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
pub struct InstanceFlavor {
    #[serde(rename = "id")]
    pub id: FlavorId,
    #[serde(rename = "links", default)]
    pub links: Vec<Link>,
}

#[derive(Serialize, Deserialize, PartialEq, Clone, Debug)]
pub struct Volume {
    #[serde(rename = "size")]
    pub size: u32,
    #[serde(rename = "used", default, skip_serializing_if = "Option::is_none")]
    pub used: Option<f64>,
}

#[derive(Serialize, Deserialize, PartialEq, Clone, Debug)]
pub struct Instance {
    #[serde(rename = "id")]
    pub id: String,
    #[serde(rename = "name")]
    pub name: String,
    #[serde(rename = "status")]
    pub status: Status,
    #[serde(rename = "flavor", default)]
    pub flavor: Option<InstanceFlavor>,
    #[serde(rename = "volume", default)]
    pub volume: Option<Volume>,
    #[serde(rename = "hostname", default)]
    pub hostname: Option<String>,
    #[serde(rename = "links", default)]
    pub links: Vec<Link>,
}

impl Display for Instance {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.status)
    }
}

impl Instance {
    /// returns the url of the instance, which is the first link given by the
    /// api
    pub fn url(&self) -> Option<&str> {
        self.links.first().map(|link| link.href.as_str())
    }
}

#[derive(Serialize, Deserialize, PartialEq, Clone, Debug)]
pub struct Instances {
    #[serde(rename = "instances")]
    pub instances: Vec<Instance>,
}

#[derive(Serialize, Deserialize, PartialEq, Clone, Debug)]
pub struct InstanceEnvelope {
    #[serde(rename = "instance")]
    pub instance: Instance,
}

// -----------------------------------------------------------------------------
// Options structures

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
pub struct DatabaseOpts {
    #[serde(rename = "name")]
    pub name: String,
    #[serde(rename = "character_set")]
    pub character_set: String,
    #[serde(rename = "collate")]
    pub collate: String,
}

impl DatabaseOpts {
    pub fn new(name: String) -> Self {
        Self {
            name,
            character_set: DEFAULT_CHARACTER_SET.to_string(),
            collate: DEFAULT_COLLATE.to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
pub struct DatabaseName {
    #[serde(rename = "name")]
    pub name: String,
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
pub struct UserOpts {
    #[serde(rename = "name")]
    pub name: String,
    #[serde(rename = "password")]
    pub password: String,
    #[serde(rename = "databases")]
    pub databases: Vec<DatabaseName>,
}

#[derive(Serialize, Deserialize, PartialEq, Clone, Debug)]
pub struct VolumeOpts {
    #[serde(rename = "size")]
    pub size: u32,
}

#[derive(Serialize, Deserialize, PartialEq, Clone, Debug)]
pub struct CreateInstanceOpts {
    #[serde(rename = "name")]
    pub name: String,
    #[serde(rename = "flavorRef")]
    pub flavor_ref: String,
    #[serde(rename = "volume")]
    pub volume: VolumeOpts,
    #[serde(rename = "databases")]
    pub databases: Vec<DatabaseOpts>,
    #[serde(rename = "users")]
    pub users: Vec<UserOpts>,
}

impl CreateInstanceOpts {
    pub fn new(name: String, flavor: &Flavor, volume_size: u32) -> Self {
        Self {
            name,
            flavor_ref: flavor.reference(),
            volume: VolumeOpts { size: volume_size },
            databases: vec![],
            users: vec![],
        }
    }
}

#[derive(Serialize, Clone, Debug)]
struct CreateInstanceRequest<'a> {
    #[serde(rename = "instance")]
    instance: &'a CreateInstanceOpts,
}

#[derive(Serialize, Clone, Debug)]
struct CreateDatabasesRequest<'a> {
    #[serde(rename = "databases")]
    databases: &'a [DatabaseOpts],
}

#[derive(Serialize, Clone, Debug)]
struct CreateUsersRequest<'a> {
    #[serde(rename = "users")]
    users: &'a [UserOpts],
}

// -----------------------------------------------------------------------------
// Helpers functions

/// returns the list of instance flavors
pub async fn list_flavors(client: &Client, endpoint: &str) -> Result<Vec<Flavor>, ClientError> {
    let path = format!("{}/flavors", endpoint);

    debug!(path = &path, "execute a request to get the list of flavors");
    let res: Flavors = client.get(&path).await?;

    Ok(res.flavors)
}

/// returns the list of database instances
pub async fn list_instances(
    client: &Client,
    endpoint: &str,
) -> Result<Vec<Instance>, ClientError> {
    let path = format!("{}/instances", endpoint);

    debug!(path = &path, "execute a request to get the list of instances");
    let res: Instances = client.get(&path).await?;

    Ok(res.instances)
}

/// returns the instance for the given identifier
pub async fn get_instance(
    client: &Client,
    endpoint: &str,
    id: &str,
) -> Result<Instance, ClientError> {
    let path = format!("{}/instances/{}", endpoint, id);

    debug!(
        path = &path,
        id = id,
        "execute a request to get information about an instance"
    );
    let res: InstanceEnvelope = client.get(&path).await?;

    Ok(res.instance)
}

/// create the instance and returns it
pub async fn create_instance(
    client: &Client,
    endpoint: &str,
    opts: &CreateInstanceOpts,
) -> Result<Instance, ClientError> {
    let path = format!("{}/instances", endpoint);

    debug!(
        path = &path,
        name = &opts.name,
        flavor = &opts.flavor_ref,
        volume = opts.volume.size,
        "execute a request to create an instance"
    );
    let res: InstanceEnvelope = client
        .post(&path, &CreateInstanceRequest { instance: opts })
        .await?;

    Ok(res.instance)
}

/// create a database in the given instance
pub async fn create_database(
    client: &Client,
    endpoint: &str,
    instance_id: &str,
    opts: &DatabaseOpts,
) -> Result<(), ClientError> {
    let path = format!("{}/instances/{}/databases", endpoint, instance_id);

    debug!(
        path = &path,
        instance = instance_id,
        name = &opts.name,
        "execute a request to create a database"
    );
    client
        .post_empty(
            &path,
            &CreateDatabasesRequest {
                databases: std::slice::from_ref(opts),
            },
        )
        .await
}

/// create a user in the given instance
pub async fn create_user(
    client: &Client,
    endpoint: &str,
    instance_id: &str,
    opts: &UserOpts,
) -> Result<(), ClientError> {
    let path = format!("{}/instances/{}/users", endpoint, instance_id);

    debug!(
        path = &path,
        instance = instance_id,
        name = &opts.name,
        "execute a request to create a user"
    );
    client
        .post_empty(
            &path,
            &CreateUsersRequest {
                users: std::slice::from_ref(opts),
            },
        )
        .await
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use super::*;
    use crate::svc::rackspace::fake;

    #[test]
    fn flavors_are_listed_with_their_ram() {
        let flavors: Flavors = serde_json::from_str(
            r#"{
  "flavors": [
    {
      "id": 1,
      "name": "512MB Instance",
      "ram": 512,
      "links": [
        { "href": "https://dfw.databases.api.rackspacecloud.com/v1.0/1234/flavors/1", "rel": "self" },
        { "href": "https://dfw.databases.api.rackspacecloud.com/flavors/1", "rel": "bookmark" }
      ]
    },
    { "id": 2, "name": "1GB Instance", "ram": 1024, "links": [] }
  ]
}"#,
        )
        .expect("flavors to be deserialized");

        assert_eq!(flavors.flavors[0].to_string(), "1) 512MB Instance (512)");
        assert_eq!(
            flavors.flavors[0].reference(),
            "https://dfw.databases.api.rackspacecloud.com/v1.0/1234/flavors/1"
        );
        assert_eq!(flavors.flavors[1].reference(), "2");
    }

    #[test]
    fn instance_exposes_status_and_url() {
        let envelope: InstanceEnvelope = serde_json::from_str(
            r#"{
  "instance": {
    "created": "2026-10-16T09:00:00",
    "flavor": { "id": "1", "links": [] },
    "hostname": "e09ad9a3f73309469cf1f43d11e79549caf9acf2.rackspaceclouddb.com",
    "id": "d4603f69-ec7e-4e9b-803f-600b9205576f",
    "links": [
      { "href": "https://dfw.databases.api.rackspacecloud.com/v1.0/1234/instances/d4603f69-ec7e-4e9b-803f-600b9205576f", "rel": "self" }
    ],
    "name": "json_rack_instance",
    "status": "BUILD",
    "updated": "2026-10-16T09:00:00",
    "volume": { "size": 2, "used": 0.16 }
  }
}"#,
        )
        .expect("instance to be deserialized");

        let instance = envelope.instance;
        assert_eq!(instance.status, Status::Build);
        assert_eq!(instance.to_string(), "json_rack_instance (BUILD)");
        assert_eq!(
            instance.url(),
            Some(
                "https://dfw.databases.api.rackspacecloud.com/v1.0/1234/instances/\
                 d4603f69-ec7e-4e9b-803f-600b9205576f"
            )
        );
        assert_eq!(
            instance.flavor.map(|flavor| flavor.id.to_string()),
            Some("1".to_string())
        );
    }

    #[test]
    fn unknown_status_is_kept_verbatim() {
        let status: Status = serde_json::from_str("\"MIGRATING\"").expect("status to parse");

        assert_eq!(status, Status::Other("MIGRATING".into()));
        assert_eq!(status.to_string(), "MIGRATING");
        assert!(!status.is_terminal_failure());
        assert!(Status::from("failed".to_string()).is_terminal_failure());
    }

    #[test]
    fn create_instance_request_wraps_options() {
        let flavor = Flavor {
            id: 3,
            name: "2GB Instance".into(),
            ram: 2048,
            links: vec![],
        };
        let opts = CreateInstanceOpts::new("db01".into(), &flavor, 5);

        let value = serde_json::to_value(CreateInstanceRequest { instance: &opts })
            .expect("request to be serialized");

        assert_eq!(
            value,
            serde_json::json!({
                "instance": {
                    "name": "db01",
                    "flavorRef": "3",
                    "volume": { "size": 5 },
                    "databases": [],
                    "users": []
                }
            })
        );
    }

    #[test]
    fn create_user_request_grants_databases() {
        let opts = UserOpts {
            name: "db_user1".into(),
            password: "s3cr3t".into(),
            databases: vec![DatabaseName {
                name: "db_name1".into(),
            }],
        };

        let value = serde_json::to_value(CreateUsersRequest {
            users: std::slice::from_ref(&opts),
        })
        .expect("request to be serialized");

        assert_eq!(
            value,
            serde_json::json!({
                "users": [
                    {
                        "name": "db_user1",
                        "password": "s3cr3t",
                        "databases": [{ "name": "db_name1" }]
                    }
                ]
            })
        );
    }

    #[tokio::test]
    async fn database_is_created_in_the_instance() {
        let (endpoint, request) = fake::serve_once(StatusCode::ACCEPTED, "").await;

        create_database(
            &fake::loopback_client(),
            &endpoint,
            "abc",
            &DatabaseOpts::new("db_name1".into()),
        )
        .await
        .unwrap();

        let request = request.await.unwrap();
        assert!(request.starts_with("POST /instances/abc/databases HTTP/1.1\r\n"));
        assert!(request.contains(r#"{"databases":[{"name":"db_name1""#));
    }
}
