// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use anyhow::Result;
use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, DownloadFromContainerOptions, ListContainersOptions,
    LogOutput, LogsOptions, RemoveContainerOptions, StartContainerOptions, WaitContainerOptions,
};
use bollard::errors::Error as BollardError;
use bollard::image::CreateImageOptions;
use bollard::models::HostConfig;
use bollard::Docker;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use std::collections::HashMap;
use std::io::Read;

use crate::domain::models::worker_process::{ProcessState, WorkerProcess, LABEL_TASK_OWNER};
use crate::domain::repositories::runtime_repository::{
    RuntimeError, RuntimeRepository, WorkerSpec,
};

/// Docker容器运行时适配器
///
/// `RuntimeRepository` 的bollard实现。只做运行时调用的翻译，
/// 不包含任何任务编排策略。
#[derive(Clone)]
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// 按环境默认方式连接本地Docker守护进程
    pub fn connect() -> Result<Self> {
        let docker = Docker::connect_with_local_defaults()?;
        Ok(Self { docker })
    }
}

fn io_error(e: BollardError) -> RuntimeError {
    RuntimeError::Io(e.to_string())
}

// The copy-out endpoint wraps the single result file in a tar archive;
// only the first entry's bytes are of interest.
fn unpack_single_file(archive: &[u8]) -> Result<Bytes, RuntimeError> {
    let mut archive = tar::Archive::new(archive);
    let mut entries = archive
        .entries()
        .map_err(|e| RuntimeError::Io(e.to_string()))?;

    let entry = entries
        .next()
        .ok_or_else(|| RuntimeError::Io("empty archive from copy-out".to_string()))?
        .map_err(|e| RuntimeError::Io(e.to_string()))?;

    let mut entry = entry;
    let mut contents = Vec::with_capacity(entry.header().size().unwrap_or(0) as usize);
    entry
        .read_to_end(&mut contents)
        .map_err(|e| RuntimeError::Io(e.to_string()))?;
    Ok(Bytes::from(contents))
}

#[async_trait]
impl RuntimeRepository for DockerRuntime {
    async fn ping(&self) -> Result<(), RuntimeError> {
        self.docker.ping().await.map_err(io_error)?;
        Ok(())
    }

    async fn pull_image(&self, image: &str) -> Result<(), RuntimeError> {
        let options = CreateImageOptions {
            from_image: image,
            ..Default::default()
        };
        let mut progress = self.docker.create_image(Some(options), None, None);
        while let Some(update) = progress.next().await {
            update.map_err(io_error)?;
        }
        Ok(())
    }

    async fn create(&self, spec: &WorkerSpec) -> Result<String, RuntimeError> {
        let config = Config {
            image: Some(spec.image.clone()),
            env: Some(spec.env.clone()),
            labels: Some(spec.labels.clone()),
            host_config: Some(HostConfig {
                // Removal happens explicitly after the result file is
                // copied out; auto-remove would race the copy.
                auto_remove: Some(false),
                ..Default::default()
            }),
            ..Default::default()
        };

        let created = self
            .docker
            .create_container(None::<CreateContainerOptions<String>>, config)
            .await
            .map_err(io_error)?;
        Ok(created.id)
    }

    async fn start(&self, id: &str) -> Result<(), RuntimeError> {
        self.docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await
            .map_err(io_error)?;
        Ok(())
    }

    async fn wait(&self, id: &str) -> Result<i64, RuntimeError> {
        let mut wait = self
            .docker
            .wait_container(id, None::<WaitContainerOptions<String>>);

        match wait.next().await {
            Some(Ok(response)) => Ok(response.status_code),
            // A non-zero exit surfaces as this error variant carrying the
            // code; it is an exit status, not a wait-protocol failure.
            Some(Err(BollardError::DockerContainerWaitError { code, .. })) => Ok(code),
            Some(Err(e)) => Err(RuntimeError::Wait(e.to_string())),
            None => Err(RuntimeError::Wait(
                "wait stream closed before an exit status".to_string(),
            )),
        }
    }

    async fn copy_file(&self, id: &str, path: &str) -> Result<Bytes, RuntimeError> {
        let options = DownloadFromContainerOptions {
            path: path.to_string(),
        };
        let chunks: Vec<Bytes> = self
            .docker
            .download_from_container(id, Some(options))
            .try_collect()
            .await
            .map_err(io_error)?;
        unpack_single_file(&chunks.concat())
    }

    async fn remove(&self, id: &str) -> Result<(), RuntimeError> {
        let options = RemoveContainerOptions {
            force: true,
            v: true,
            ..Default::default()
        };
        self.docker
            .remove_container(id, Some(options))
            .await
            .map_err(|e| match e {
                BollardError::DockerResponseServerError {
                    status_code: 404, ..
                } => RuntimeError::NotFound(id.to_string()),
                other => io_error(other),
            })?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<WorkerProcess>, RuntimeError> {
        // Presence of the owner label marks a process as managed by this
        // system, whether scraper or proxy.
        let mut filters = HashMap::new();
        filters.insert("label".to_string(), vec![LABEL_TASK_OWNER.to_string()]);

        let options = ListContainersOptions::<String> {
            all: false,
            filters,
            ..Default::default()
        };

        let containers = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(io_error)?;

        Ok(containers
            .into_iter()
            .filter_map(|c| {
                let id = c.id?;
                let labels = c.labels.unwrap_or_default();
                let state = ProcessState::from_runtime_state(c.state.as_deref().unwrap_or(""));
                Some(WorkerProcess { id, labels, state })
            })
            .collect())
    }

    async fn log_stream(
        &self,
        id: &str,
    ) -> Result<BoxStream<'static, Result<Bytes, RuntimeError>>, RuntimeError> {
        let options = LogsOptions::<String> {
            follow: true,
            stdout: true,
            stderr: true,
            ..Default::default()
        };

        // Forward through an owned channel so the returned stream does not
        // borrow the client.
        let (tx, rx) = futures::channel::mpsc::unbounded();
        let docker = self.docker.clone();
        let id = id.to_string();
        tokio::spawn(async move {
            let mut logs = docker.logs(&id, Some(options));
            while let Some(item) = logs.next().await {
                let mapped = match item {
                    Ok(LogOutput::StdOut { message })
                    | Ok(LogOutput::StdErr { message })
                    | Ok(LogOutput::Console { message }) => Ok(message),
                    Ok(LogOutput::StdIn { .. }) => Ok(Bytes::new()),
                    Err(e) => Err(io_error(e)),
                };
                if tx.unbounded_send(mapped).is_err() {
                    // Receiver dropped; stop tailing.
                    break;
                }
            }
        });
        Ok(rx.boxed())
    }
}
