use std::{io::ErrorKind, path::Path};

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use log::error;
use tokio::fs;

use opsboard_corelib::{
    constants::{CacheControl, ContentType},
    err::ErrResp,
};

use super::super::super::State as AppState;
use crate::libs::contacts;

/// `GET /{base}/api/v1/contacts/export`
///
/// Downloads the static phonebook file.
pub async fn get_export(State(state): State<AppState>) -> Result<Response, ErrResp> {
    const FN_NAME: &'static str = "get_export";

    let path = state.contacts.xml_file.as_str();
    let xml = match fs::read_to_string(path).await {
        Err(e) => match e.kind() {
            ErrorKind::NotFound => {
                error!("[{}] file {} not found", FN_NAME, path);
                return Err(ErrResp::ErrNotFound(Some("file not found".to_string())));
            }
            _ => {
                error!("[{}] read file {} error: {}", FN_NAME, path, e);
                return Err(ErrResp::ErrUnknown(Some("read file error".to_string())));
            }
        },
        Ok(xml) => xml,
    };
    let file_name = match Path::new(path).file_name() {
        None => "phonebook.xml".to_string(),
        Some(name) => name.to_string_lossy().to_string(),
    };
    let disposition = format!("attachment; filename=\"{}\"", file_name);
    Ok((
        [
            (header::CONTENT_TYPE, ContentType::XML.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        xml,
    )
        .into_response())
}

/// `GET /{base}/api/v1/contacts/phonebook.xml`
///
/// Generates the phonebook from the contact store.
pub async fn get_phonebook(State(state): State<AppState>) -> Result<Response, ErrResp> {
    const FN_NAME: &'static str = "get_phonebook";

    let list = match state.contacts.store.as_ref() {
        None => vec![],
        Some(store) => match store.list().await {
            Err(e) => {
                error!("[{}] list contacts error: {}", FN_NAME, e);
                let e = format!("list contacts error: {}", e);
                return Err(ErrResp::ErrIntMsg(Some(e)));
            }
            Ok(list) => list,
        },
    };
    Ok((
        [
            (header::CONTENT_TYPE, ContentType::XML),
            (header::CACHE_CONTROL, CacheControl::PHONEBOOK),
        ],
        contacts::phonebook_xml(&list),
    )
        .into_response())
}
