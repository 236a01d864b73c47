// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::info::SessionInfo;
use crate::{archive, lapviz};
use common::device_session::DeviceSession;
use common::messages::ContainerError;
use module_core::{
    DeleteSessionRequestPtr, EmptyRequestPtr, EventKind, LoadSessionRequestPtr, Module, ModuleCtx,
    Response, SaveSessionRequestPtr,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, error, info};

/// A file system–backed [`DeviceSession`] container, one LapViz payload
/// (optionally zip-wrapped) plus a JSON `.info` sidecar per session.
///
/// Holds no internal locking: only one instance should point at a given
/// `root_dir` at a time, matching the teacher's file storage module.
pub struct FsSessionContainer {
    root_dir: PathBuf,
    zip: bool,
    ctx: ModuleCtx,
}

const SESSION_EXTENSIONS: [&str; 3] = ["lapviz", "lvz", "lz"];

impl FsSessionContainer {
    pub fn new(root_dir: impl Into<PathBuf>, ctx: ModuleCtx) -> Self {
        let root_dir = root_dir.into();
        if let Err(e) = std::fs::DirBuilder::new().recursive(true).create(&root_dir) {
            error!("Failed to create session container folder {}. Error: {e}", root_dir.display());
        }
        info!("Using session container folder: {}", root_dir.display());
        FsSessionContainer { root_dir, zip: false, ctx }
    }

    /// Writes every session zip-wrapped (`.lvz`) instead of plain text
    /// (`.lapviz`).
    pub fn with_zip(mut self, zip: bool) -> Self {
        self.zip = zip;
        self
    }

    fn session_extension(&self) -> &'static str {
        if self.zip { "lvz" } else { "lapviz" }
    }

    fn session_path(&self, id: &str) -> PathBuf {
        let mut path = self.root_dir.clone();
        path.push(id);
        path.set_extension(self.session_extension());
        path
    }

    fn info_path(&self, id: &str) -> PathBuf {
        let mut path = self.root_dir.clone();
        path.push(id);
        path.set_extension("info");
        path
    }

    async fn existing_session_path(&self, id: &str) -> Result<PathBuf, ContainerError> {
        for ext in SESSION_EXTENSIONS {
            let mut path = self.root_dir.clone();
            path.push(id);
            path.set_extension(ext);
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                return Ok(path);
            }
        }
        Err(ContainerError::NotFound)
    }

    async fn write_bytes(&self, path: &Path, bytes: &[u8]) -> Result<(), ContainerError> {
        let mut file = tokio::fs::File::create(path).await.map_err(|e| ContainerError::Io(e.to_string()))?;
        file.write_all(bytes).await.map_err(|e| ContainerError::Io(e.to_string()))?;
        file.sync_all().await.map_err(|e| ContainerError::Io(e.to_string()))?;
        Ok(())
    }

    async fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, ContainerError> {
        let mut file = tokio::fs::File::open(path).await.map_err(|e| ContainerError::Io(e.to_string()))?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes).await.map_err(|e| ContainerError::Io(e.to_string()))?;
        Ok(bytes)
    }

    pub async fn save(&self, session: &DeviceSession) -> Result<String, ContainerError> {
        let text = lapviz::encode(session);
        let bytes = if self.zip {
            archive::wrap(&format!("{}.lapviz", session.id), &text).map_err(|e| ContainerError::Io(e.to_string()))?
        } else {
            text.into_bytes()
        };
        self.write_bytes(&self.session_path(&session.id), &bytes).await?;

        let info = SessionInfo::from_session(session);
        let info_json = info.to_json().map_err(|e| ContainerError::Malformed(e.to_string()))?;
        self.write_bytes(&self.info_path(&session.id), info_json.as_bytes()).await?;
        Ok(session.id.clone())
    }

    pub async fn load(&self, id: &str) -> Result<DeviceSession, ContainerError> {
        let path = self.existing_session_path(id).await?;
        let bytes = self.read_bytes(&path).await?;
        let text = if archive::is_zip(&bytes) {
            archive::unwrap(&bytes).map_err(|e| ContainerError::Io(e.to_string()))?
        } else {
            String::from_utf8(bytes).map_err(|e| ContainerError::Malformed(e.to_string()))?
        };
        lapviz::decode(&text).map_err(ContainerError::from)
    }

    pub async fn delete(&self, id: &str) -> Result<(), ContainerError> {
        let path = self.existing_session_path(id).await?;
        tokio::fs::remove_file(&path).await.map_err(|e| ContainerError::Io(e.to_string()))?;
        let info_path = self.info_path(id);
        if tokio::fs::try_exists(&info_path).await.unwrap_or(false) {
            let _ = tokio::fs::remove_file(&info_path).await;
        }
        Ok(())
    }

    pub async fn ids(&self) -> Result<Vec<String>, ContainerError> {
        let mut dirs = tokio::fs::read_dir(&self.root_dir)
            .await
            .map_err(|e| ContainerError::Io(e.to_string()))?;
        let mut result = Vec::new();
        while let Some(entry) = dirs.next_entry().await.map_err(|e| ContainerError::Io(e.to_string()))? {
            let metadata = entry.metadata().await.map_err(|e| ContainerError::Io(e.to_string()))?;
            if !metadata.is_file() {
                continue;
            }
            if let Some(ext) = entry.path().extension().and_then(|e| e.to_str())
                && SESSION_EXTENSIONS.contains(&ext)
                && let Some(stem) = entry.path().file_stem()
            {
                result.push(stem.to_string_lossy().to_string());
            }
        }
        result.sort();
        result.dedup();
        Ok(result)
    }

    async fn handle_save(&self, req: &SaveSessionRequestPtr) {
        let result = self.save(&req.data).await;
        match &result {
            Ok(id) => debug!("Stored session {id} in {}", self.root_dir.display()),
            Err(e) => debug!("Failed to store session {}. Error: {e:?}", req.data.id),
        }
        let resp = Response::new(req.id, req.sender_addr, result);
        let _ = self.ctx.publish_event(EventKind::SaveSessionResponseEvent(resp));
    }

    async fn handle_load(&self, req: &LoadSessionRequestPtr) {
        let result = self.load(&req.data).await.map(Arc::new);
        if let Err(e) = &result {
            debug!("Failed to load session {}. Error: {e:?}", req.data);
        }
        let resp = Response::new(req.id, req.sender_addr, result);
        let _ = self.ctx.publish_event(EventKind::LoadSessionResponseEvent(resp));
    }

    async fn handle_delete(&self, req: &DeleteSessionRequestPtr) {
        let result = self.delete(&req.data).await;
        let resp = Response::new(req.id, req.sender_addr, result);
        let _ = self.ctx.publish_event(EventKind::DeleteSessionResponseEvent(resp));
    }

    async fn handle_list(&self, req: &EmptyRequestPtr) {
        let ids = self.ids().await.unwrap_or_default();
        let resp = Response::new(req.id, req.sender_addr, ids);
        let _ = self.ctx.publish_event(EventKind::ListStoredSessionIdsResponseEvent(resp));
    }
}

#[async_trait::async_trait]
impl Module for FsSessionContainer {
    async fn run(&mut self) -> Result<(), ()> {
        let mut running = true;
        while running {
            match self.ctx.receiver.recv().await {
                Ok(event) => match event.kind {
                    EventKind::QuitEvent => running = false,
                    EventKind::SaveSessionRequestEvent(req) => self.handle_save(&req).await,
                    EventKind::LoadSessionRequestEvent(req) => self.handle_load(&req).await,
                    EventKind::DeleteSessionRequestEvent(req) => self.handle_delete(&req).await,
                    EventKind::ListStoredSessionIdsRequestEvent(req) => self.handle_list(&req).await,
                    _ => {}
                },
                Err(e) => error!("Failed to receive event in module Container. Error: {e}"),
            }
        }
        Ok(())
    }
}
