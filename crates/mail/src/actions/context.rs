//! Resolution of the caller's active connection and driver

use log::{error, info};
use std::sync::Arc;

use super::session::{INBOX_PATH, Revalidator, SessionProvider};
use crate::driver::{DriverAuth, DriverFactory, MailDriver};
use crate::error::{Error, Result};
use crate::models::{Connection, Session};
use crate::storage::ConnectionStore;

/// Everything an action needs to reach the caller's mailbox
#[derive(Clone)]
pub struct ActionContext {
    sessions: Arc<dyn SessionProvider>,
    store: Arc<dyn ConnectionStore>,
    drivers: Arc<dyn DriverFactory>,
    revalidator: Arc<dyn Revalidator>,
}

impl ActionContext {
    pub fn new(
        sessions: Arc<dyn SessionProvider>,
        store: Arc<dyn ConnectionStore>,
        drivers: Arc<dyn DriverFactory>,
        revalidator: Arc<dyn Revalidator>,
    ) -> Self {
        Self {
            sessions,
            store,
            drivers,
            revalidator,
        }
    }

    pub fn session(&self) -> Option<Session> {
        self.sessions.current_session()
    }

    pub fn store(&self) -> &Arc<dyn ConnectionStore> {
        &self.store
    }

    /// Build a driver for the session's connection
    ///
    /// Fails with `InvalidSession` when there is no session or it has no
    /// connection, and `InvalidConnection` when the record is missing or
    /// lacks either token.
    pub fn get_active_driver(&self) -> Result<Arc<dyn MailDriver>> {
        let session = self.session().ok_or_else(Error::invalid_session)?;
        let connection_id = session
            .active_connection_id()
            .ok_or_else(Error::invalid_session)?;

        let connection = self
            .store
            .get_connection(&session.user_id, connection_id)?
            .ok_or_else(Error::invalid_connection)?;

        let (Some(access_token), Some(refresh_token)) = (
            connection.access_token.filter(|t| !t.is_empty()),
            connection.refresh_token.filter(|t| !t.is_empty()),
        ) else {
            return Err(Error::invalid_connection());
        };

        self.drivers.create(
            &connection.provider_id,
            DriverAuth {
                access_token,
                refresh_token,
                email: connection.email,
            },
        )
    }

    /// The session's connection record, or `None` for any missing piece
    pub fn get_active_connection(&self) -> Option<Connection> {
        let session = self.session()?;
        let connection_id = session.active_connection_id()?;
        match self.store.latest_connection(&session.user_id, connection_id) {
            Ok(connection) => connection,
            Err(e) => {
                error!("Failed to load active connection: {}", e);
                None
            }
        }
    }

    /// Sign out, drop the stored connection and revalidate the inbox
    pub fn delete_active_connection(&self) -> Result<()> {
        let Some(session) = self.session() else {
            info!("No connection ID found");
            return Ok(());
        };
        let Some(connection_id) = session.active_connection_id() else {
            info!("No connection ID found");
            return Ok(());
        };

        let result = self.sessions.sign_out().and_then(|_| {
            self.store
                .delete_connection(&session.user_id, connection_id)
                .map(|_| ())
        });
        if let Err(e) = result {
            error!("Error deleting connection: {}", e);
            return Err(e);
        }

        info!("Deleted connection {}, please reload", connection_id);
        self.revalidator.revalidate(INBOX_PATH);
        Ok(())
    }
}
