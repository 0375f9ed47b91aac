use crate::api::{
    AddColumnBody, AddRowBody, ErrorBody, ImportBody, RenameRowBody, TableApi,
    UpdateAnnotationBody, UpdateCellBody,
};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{AxisConfig, AxisConfigRequest, ExportSnapshot, TableData};
use log::{debug, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::thread;
use std::time::Duration;

/// `TableApi` over HTTP, backed by a `ureq` agent.
pub struct HttpApi {
    agent: ureq::Agent,
    base_url: String,
    token: Option<String>,
    read_retries: u32,
    retry_interval: Duration,
}

impl HttpApi {
    pub fn new(config: &Config, token: Option<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(config.request_timeout)
            .build();
        HttpApi {
            agent,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            token,
            read_retries: config.read_retries,
            retry_interval: config.retry_interval,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: &str, path: &str) -> ureq::Request {
        let url = format!("{}{}", self.base_url, path);
        let request = self.agent.request(method, &url);
        match &self.token {
            Some(token) => request.set("Authorization", &format!("Bearer {token}")),
            None => request,
        }
    }

    /// GET with the read retry policy: a failed read is retried after a fixed delay.
    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let mut attempt = 0;
        loop {
            match self.request("GET", path).call() {
                Ok(response) => return read_json(response),
                Err(err) if attempt < self.read_retries => {
                    attempt += 1;
                    warn!(
                        "GET {} failed ({}), retrying in {:?}",
                        path, err, self.retry_interval
                    );
                    thread::sleep(self.retry_interval);
                }
                Err(err) => return Err(map_error(err)),
            }
        }
    }

    /// Writes are sent exactly once.
    fn send_json<B: Serialize>(&self, method: &str, path: &str, body: &B) -> Result<ureq::Response> {
        let payload = serde_json::to_string(body)?;
        debug!("{} {}", method, path);
        self.request(method, path)
            .set("Content-Type", "application/json")
            .send_string(&payload)
            .map_err(map_error)
    }

    fn delete(&self, path: &str) -> Result<()> {
        debug!("DELETE {}", path);
        self.request("DELETE", path).call().map_err(map_error)?;
        Ok(())
    }
}

fn segment(name: &str) -> String {
    urlencoding::encode(name).into_owned()
}

fn read_json<T: DeserializeOwned>(response: ureq::Response) -> Result<T> {
    let body = response.into_string()?;
    Ok(serde_json::from_str(&body)?)
}

fn map_error(err: ureq::Error) -> Error {
    match err {
        ureq::Error::Status(status, response) => {
            let body = response.into_string().unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or_else(|_| format!("request failed with status {status}"));
            Error::Server { status, message }
        }
        ureq::Error::Transport(transport) => Error::Transport(transport.to_string()),
    }
}

impl TableApi for HttpApi {
    fn fetch_table(&self) -> Result<TableData> {
        self.get_json("/table")
    }

    fn add_column(&self, column_name: &str) -> Result<()> {
        self.send_json("POST", "/column", &AddColumnBody { column_name })?;
        Ok(())
    }

    fn add_row(&self, name: &str) -> Result<()> {
        self.send_json("POST", "/row", &AddRowBody { name })?;
        Ok(())
    }

    fn rename_row(&self, old_name: &str, new_name: &str) -> Result<()> {
        let path = format!("/row/{}/name", segment(old_name));
        self.send_json("PUT", &path, &RenameRowBody { new_name })?;
        Ok(())
    }

    fn update_cell(&self, row_id: &str, column_name: &str, value: f64) -> Result<()> {
        let body = UpdateCellBody {
            row_id,
            column_name,
            value,
        };
        self.send_json("PUT", "/cell", &body)?;
        Ok(())
    }

    fn update_annotation(&self, row_id: &str, annotation: &str) -> Result<()> {
        let body = UpdateAnnotationBody { row_id, annotation };
        self.send_json("PUT", "/annotation", &body)?;
        Ok(())
    }

    fn delete_column(&self, column_name: &str) -> Result<()> {
        self.delete(&format!("/column/{}", segment(column_name)))
    }

    fn delete_row(&self, name: &str) -> Result<()> {
        self.delete(&format!("/row/{}", segment(name)))
    }

    fn export_table(&self) -> Result<ExportSnapshot> {
        self.get_json("/export")
    }

    fn import_table(&self, data: &Value) -> Result<()> {
        self.send_json("POST", "/import", &ImportBody { data })?;
        Ok(())
    }

    fn list_axis_configs(&self) -> Result<Vec<AxisConfig>> {
        self.get_json("/axis-settings")
    }

    fn create_axis_config(&self, request: &AxisConfigRequest) -> Result<AxisConfig> {
        let response = self.send_json("POST", "/axis-settings", request)?;
        read_json(response)
    }

    fn update_axis_config(&self, id: i64, request: &AxisConfigRequest) -> Result<AxisConfig> {
        let response = self.send_json("PUT", &format!("/axis-settings/{id}"), request)?;
        read_json(response)
    }

    fn delete_axis_config(&self, id: i64) -> Result<()> {
        self.delete(&format!("/axis-settings/{id}"))
    }

    fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }
}
