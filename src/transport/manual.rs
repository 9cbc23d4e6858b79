use super::{CollectionTransport, TransportResult};
use crate::core::{Entity, EntityId, EntityPatch, NewEntity, TransportError};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::{Notify, oneshot};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportRequest {
    Create(NewEntity),
    Update { id: EntityId, patch: EntityPatch },
    Delete(EntityId),
}

impl TransportRequest {
    pub fn target_id(&self) -> Option<&EntityId> {
        match self {
            Self::Create(_) => None,
            Self::Update { id, .. } => Some(id),
            Self::Delete(id) => Some(id),
        }
    }
}

/// An in-flight call parked until someone answers it.
#[derive(Debug)]
pub struct TransportCall {
    request: TransportRequest,
    reply: oneshot::Sender<TransportResult<Option<Entity>>>,
}

impl TransportCall {
    pub fn request(&self) -> &TransportRequest {
        &self.request
    }

    /// Replies with an explicit server record (create/update).
    pub fn succeed_with(self, entity: Entity) {
        let _ = self.reply.send(Ok(Some(entity)));
    }

    /// Create: the record under `server_id`. Update: `base` with the request
    /// patch applied. Delete: an empty success.
    pub fn accept(self, server_id: &str, base: Option<&Entity>) {
        let now = Utc::now();
        let reply = match &self.request {
            TransportRequest::Create(data) => Some(Entity::provisional(
                EntityId::from(server_id),
                data,
                "server",
                now,
            )),
            TransportRequest::Update { patch, .. } => base.map(|base| {
                let mut updated = patch.apply_to(base);
                updated.updated_at = now.max(base.created_at);
                updated
            }),
            TransportRequest::Delete(_) => None,
        };
        let _ = self.reply.send(Ok(reply));
    }

    pub fn fail(self, error: TransportError) {
        let _ = self.reply.send(Err(error));
    }
}

/// Transport whose calls complete only when the caller says so.
///
/// Every request is queued as a [`TransportCall`]; `next_call` hands them out
/// in issue order and the caller decides when, how, and in which order each
/// one resolves.
#[derive(Default)]
pub struct ManualTransport {
    queue: Mutex<VecDeque<TransportCall>>,
    notify: Notify,
}

impl ManualTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for the next parked call.
    pub async fn next_call(&self) -> TransportCall {
        loop {
            let notified = self.notify.notified();
            if let Some(call) = self.try_next_call() {
                return call;
            }
            notified.await;
        }
    }

    pub fn try_next_call(&self) -> Option<TransportCall> {
        self.queue
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .pop_front()
    }

    pub fn parked(&self) -> usize {
        self.queue
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    async fn park(&self, request: TransportRequest) -> TransportResult<Option<Entity>> {
        let (reply, response) = oneshot::channel();
        self.queue
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push_back(TransportCall { request, reply });
        self.notify.notify_one();
        response.await.map_err(|_| TransportError::Closed)?
    }
}

#[async_trait]
impl CollectionTransport for ManualTransport {
    async fn create(&self, data: NewEntity) -> TransportResult<Entity> {
        self.park(TransportRequest::Create(data))
            .await?
            .ok_or(TransportError::Closed)
    }

    async fn update(&self, id: &EntityId, patch: EntityPatch) -> TransportResult<Entity> {
        self.park(TransportRequest::Update {
            id: id.clone(),
            patch,
        })
        .await?
        .ok_or(TransportError::Closed)
    }

    async fn delete(&self, id: &EntityId) -> TransportResult<()> {
        self.park(TransportRequest::Delete(id.clone())).await.map(|_| ())
    }
}
