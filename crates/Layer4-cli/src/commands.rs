//! 명령 실행 - 각 명령을 라이프사이클 호출로 옮기고 JSON 결과를 만든다

use crate::cli::{Command, ConfigAction, FolderAction};
use anyhow::Context;
use reel_core::{CloneSpec, OpResponse, PluginLifecycle, RouteRequest, StaticAuthenticator};
use reel_foundation::Result;
use serde::Serialize;
use serde_json::{json, Value};

/// 명령 결과 - 출력할 JSON과 성공 여부
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub success: bool,
    pub value: Value,
}

impl Outcome {
    fn value(value: impl Serialize) -> anyhow::Result<Self> {
        Ok(Self {
            success: true,
            value: serde_json::to_value(value)?,
        })
    }

    fn from_result<T: Serialize>(result: Result<T>) -> anyhow::Result<Self> {
        match result {
            Ok(value) => Self::value(value),
            Err(e) => Ok(OpResponse::from(e).into()),
        }
    }
}

impl From<OpResponse> for Outcome {
    fn from(resp: OpResponse) -> Self {
        let success = resp.success;
        let value = serde_json::to_value(&resp).unwrap_or_else(|_| json!({ "success": success }));
        Self { success, value }
    }
}

/// 명령 실행
pub async fn execute(
    lifecycle: &PluginLifecycle,
    auth: &StaticAuthenticator,
    command: Command,
) -> anyhow::Result<Outcome> {
    match command {
        Command::List { state, force } => Outcome::value(lifecycle.list_plugins(state, force).await),
        Command::Installed => Outcome::value(lifecycle.installed_ids()),
        Command::Statistic => Outcome::value(lifecycle.statistic()),

        Command::Config { action } => match action {
            ConfigAction::Get { id } => Outcome::value(lifecycle.get_config(&id).unwrap_or(Value::Null)),
            ConfigAction::Set { id, json } => {
                let config: Value = serde_json::from_str(&json)
                    .with_context(|| format!("config for {} is not valid JSON", id))?;
                Ok(lifecycle.set_config(&id, config).await.into())
            }
        },

        Command::Reload { id } => Ok(lifecycle.reload(&id).await.into()),
        Command::Install { id, repo_url, force } => {
            Ok(lifecycle.install(&id, repo_url.as_deref(), force).await.into())
        }
        Command::Uninstall { id } => Ok(lifecycle.uninstall(&id).await.into()),
        Command::Reset { id } => Ok(lifecycle.reset(&id).await.into()),

        Command::Clone {
            id,
            suffix,
            name,
            description,
            version,
            icon,
        } => {
            let mut spec = CloneSpec::new(suffix);
            if let Some(name) = name {
                spec = spec.with_name(name);
            }
            if let Some(description) = description {
                spec = spec.with_description(description);
            }
            if let Some(version) = version {
                spec = spec.with_version(version);
            }
            if let Some(icon) = icon {
                spec = spec.with_icon(icon);
            }
            Ok(lifecycle.clone_plugin(&id, &spec).await.into())
        }

        Command::Folders { action } => match action {
            FolderAction::List => Outcome::value(lifecycle.folders()),
            FolderAction::Create { name } => Ok(lifecycle.create_folder(&name).into()),
            FolderAction::Delete { name } => Ok(lifecycle.delete_folder(&name).into()),
            FolderAction::Set { name, ids } => Ok(lifecycle.set_folder_plugins(&name, ids).into()),
        },

        Command::Routes => {
            let bindings = lifecycle.synchronizer().table().bindings();
            let routes: Vec<Value> = bindings
                .iter()
                .map(|b| {
                    json!({
                        "path": b.path,
                        "methods": b.methods,
                        "protected": b.protected,
                        "tags": b.tags,
                        "summary": b.summary,
                    })
                })
                .collect();
            Outcome::value(routes)
        }

        Command::Call {
            path,
            method,
            api_key,
            token,
            body,
        } => {
            let mut request = RouteRequest::new(method, path);
            if let Some(key) = api_key {
                request = request.with_header("x-api-key", key);
            }
            if let Some(token) = token {
                request = request.with_header("authorization", format!("Bearer {}", token));
            }
            if let Some(body) = body {
                let body: Value = serde_json::from_str(&body).context("request body is not valid JSON")?;
                request = request.with_body(body);
            }
            let response = lifecycle.dispatch(request, auth).await;
            Ok(Outcome {
                success: response.is_success(),
                value: serde_json::to_value(&response)?,
            })
        }

        Command::Form { id } => Outcome::from_result(lifecycle.form(&id).await),
        Command::Page { id } => Outcome::from_result(lifecycle.page(&id).await),
        Command::Dashboard { id: None, .. } => Outcome::value(lifecycle.dashboard_meta().await),
        Command::Dashboard { id: Some(id), key } => {
            Outcome::from_result(lifecycle.dashboard(&id, key.as_deref()).await)
        }
        Command::File { id, path } => Outcome::from_result(
            lifecycle
                .static_file(&id, &path)
                .map(|file| json!({ "path": file.path, "mime": file.mime })),
        ),
        Command::Remotes { token } => Outcome::from_result(lifecycle.remotes(&token).await),

        Command::Backup => Ok(lifecycle.backup().await.into()),
        Command::Restore { force } => Ok(lifecycle.restore(force).await.into()),
    }
}
