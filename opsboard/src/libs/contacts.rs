//! Phonebook contacts and the XML phonebook generator.
//!
//! Contacts come from a [`ContactStore`]. The production store reads a Firestore collection
//! through the REST API.

use std::{error::Error as StdError, sync::Mutex};

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::Deserialize;
use serde_json::{Map, Value};

use opsboard_corelib::strings;

/// Phonebook contact.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Contact {
    /// Document ID.
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

/// The contact source.
#[async_trait]
pub trait ContactStore: Send + Sync {
    /// To list all contacts.
    async fn list(&self) -> Result<Vec<Contact>, Box<dyn StdError + Send + Sync>>;
}

/// Firestore REST API store.
pub struct FirestoreStore {
    client: Client,
    opts: FirestoreOpts,
}

/// Firestore collection information.
#[derive(Clone)]
pub struct FirestoreOpts {
    /// REST API base. For example `https://firestore.googleapis.com/v1`.
    pub base: String,
    pub project: String,
    /// Web API key. Public collections can be read without one.
    pub api_key: Option<String>,
    /// Collection path such as `artifacts/default-app-id/public/data/contacts`.
    pub collection: String,
}

/// In-memory store.
#[derive(Default)]
pub struct MemoryStore {
    contacts: Mutex<Vec<Contact>>,
}

#[derive(Deserialize)]
struct ListDocumentsRes {
    #[serde(default)]
    documents: Vec<Document>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct Document {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

const PAGE_SIZE: &'static str = "300";

impl FirestoreStore {
    pub fn new(client: Client, opts: FirestoreOpts) -> Self {
        FirestoreStore { client, opts }
    }

    async fn list_page(
        &self,
        page_token: Option<&str>,
    ) -> Result<ListDocumentsRes, Box<dyn StdError + Send + Sync>> {
        let mut segments = vec![
            "projects",
            self.opts.project.as_str(),
            "databases",
            "(default)",
            "documents",
        ];
        segments.extend(self.opts.collection.split('/').filter(|s| !s.is_empty()));
        let mut url = strings::url_with_segments(self.opts.base.as_str(), segments.as_slice())?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("pageSize", PAGE_SIZE);
            if let Some(token) = page_token {
                query.append_pair("pageToken", token);
            }
            if let Some(key) = self.opts.api_key.as_ref() {
                query.append_pair("key", key.as_str());
            }
        }

        let req = self.client.request(Method::GET, url).build()?;
        let resp = self.client.execute(req).await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(format!("Firestore API error: {}", status.as_u16()).into());
        }
        Ok(resp.json::<ListDocumentsRes>().await?)
    }
}

#[async_trait]
impl ContactStore for FirestoreStore {
    async fn list(&self) -> Result<Vec<Contact>, Box<dyn StdError + Send + Sync>> {
        let mut contacts = vec![];
        let mut page_token: Option<String> = None;
        loop {
            let page = self.list_page(page_token.as_deref()).await?;
            for doc in page.documents.iter() {
                contacts.push(Contact {
                    id: match doc.name.rsplit_once('/') {
                        None => doc.name.clone(),
                        Some((_, id)) => id.to_string(),
                    },
                    first_name: field_text(&doc.fields, "firstName"),
                    last_name: field_text(&doc.fields, "lastName"),
                    phone: field_text(&doc.fields, "phone"),
                });
            }
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }
        Ok(contacts)
    }
}

impl MemoryStore {
    pub fn new(contacts: Vec<Contact>) -> Self {
        MemoryStore {
            contacts: Mutex::new(contacts),
        }
    }

    /// To replace all contacts.
    pub fn set(&self, contacts: Vec<Contact>) {
        match self.contacts.lock() {
            Err(e) => *e.into_inner() = contacts,
            Ok(mut list) => *list = contacts,
        }
    }
}

#[async_trait]
impl ContactStore for MemoryStore {
    async fn list(&self) -> Result<Vec<Contact>, Box<dyn StdError + Send + Sync>> {
        match self.contacts.lock() {
            Err(e) => Ok(e.into_inner().clone()),
            Ok(list) => Ok(list.clone()),
        }
    }
}

/// To generate the phone `AddressBook` XML with the `Default` and `Blacklist` groups.
pub fn phonebook_xml(contacts: &[Contact]) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str("<AddressBook>\n");
    xml.push_str("  <version>1</version>\n");
    push_group(&mut xml, 0, "Default");
    push_group(&mut xml, 100, "Blacklist");
    for contact in contacts {
        xml.push_str("  <Contact>\n");
        xml.push_str(format!("    <id>{}</id>\n", strings::xml_escape(&contact.id)).as_str());
        xml.push_str(
            format!(
                "    <FirstName>{}</FirstName>\n",
                strings::xml_escape(&contact.first_name)
            )
            .as_str(),
        );
        xml.push_str(
            format!(
                "    <LastName>{}</LastName>\n",
                strings::xml_escape(&contact.last_name)
            )
            .as_str(),
        );
        xml.push_str("    <Department/>\n");
        xml.push_str("    <Primary>0</Primary>\n");
        xml.push_str("    <Frequent>0</Frequent>\n");
        xml.push_str("    <Phone type=\"Work\">\n");
        xml.push_str(
            format!(
                "      <phonenumber>{}</phonenumber>\n",
                strings::xml_escape(&contact.phone)
            )
            .as_str(),
        );
        xml.push_str("      <accountindex>0</accountindex>\n");
        xml.push_str("    </Phone>\n");
        xml.push_str("    <Mail type=\"Work\"/>\n");
        xml.push_str("    <PhotoUrl/>\n");
        xml.push_str("    <RingtoneUrl/>\n");
        xml.push_str("    <RingtoneIndex>0</RingtoneIndex>\n");
        xml.push_str("  </Contact>\n");
    }
    xml.push_str("</AddressBook>");
    xml
}

fn push_group(xml: &mut String, id: u32, name: &str) {
    xml.push_str("  <pbgroup>\n");
    xml.push_str(format!("    <id>{}</id>\n", id).as_str());
    xml.push_str(format!("    <name>{}</name>\n", name).as_str());
    xml.push_str("    <photos/>\n");
    xml.push_str("    <ringtones/>\n");
    xml.push_str("    <RingtoneIndex>0</RingtoneIndex>\n");
    xml.push_str("  </pbgroup>\n");
}

/// Firestore typed values. Missing fields are empty.
fn field_text(fields: &Map<String, Value>, key: &str) -> String {
    let value = match fields.get(key).and_then(|v| v.as_object()) {
        None => return String::new(),
        Some(value) => value,
    };
    match value.get("stringValue") {
        Some(Value::String(s)) => return s.clone(),
        _ => (),
    }
    match value.get("integerValue") {
        Some(Value::String(s)) => return s.clone(),
        Some(Value::Number(n)) => return n.to_string(),
        _ => (),
    }
    match value.get("doubleValue") {
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}
