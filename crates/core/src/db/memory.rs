//! In-memory user store with the same transaction semantics as the SQLite one.
//!
//! A transaction works on a private copy of the tables and publishes it on
//! commit; dropping it discards the copy.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{Result, SyncError};
use crate::models::{
    common::Context,
    directory::dn_key,
    user::{LocalUser, MergedUser},
};

use super::repository::{LocalUserStore, UserRepository, UserTransaction};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Tables {
    fe: Vec<LocalUser>,
    be: Vec<LocalUser>,
    next_uid: i64,
}

impl Tables {
    fn table(&self, context: Context) -> &Vec<LocalUser> {
        match context {
            Context::Fe => &self.fe,
            Context::Be => &self.be,
        }
    }

    fn table_mut(&mut self, context: Context) -> &mut Vec<LocalUser> {
        match context {
            Context::Fe => &mut self.fe,
            Context::Be => &mut self.be,
        }
    }

    fn user_mut(&mut self, uid: i64, context: Context) -> Result<&mut LocalUser> {
        self.table_mut(context)
            .iter_mut()
            .find(|u| u.uid == uid)
            .ok_or_else(|| SyncError::Store(format!("{context} user {uid} does not exist")))
    }

    fn insert(&mut self, mut user: LocalUser, context: Context) -> LocalUser {
        self.next_uid += 1;
        user.uid = self.next_uid;
        self.table_mut(context).push(user.clone());
        user
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryUserRepository {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a row outside any transaction and return it with its uid assigned.
    pub async fn insert(&self, user: LocalUser, context: Context) -> LocalUser {
        self.tables.lock().await.insert(user, context)
    }

    /// Committed rows of a context, in insertion order.
    pub async fn users(&self, context: Context) -> Vec<LocalUser> {
        self.tables.lock().await.table(context).clone()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn begin(&self) -> Result<Box<dyn UserTransaction>> {
        let working = self.tables.lock().await.clone();
        Ok(Box::new(MemoryUserTransaction {
            shared: Arc::clone(&self.tables),
            working,
        }))
    }
}

pub struct MemoryUserTransaction {
    shared: Arc<Mutex<Tables>>,
    working: Tables,
}

#[async_trait]
impl LocalUserStore for MemoryUserTransaction {
    async fn find_by_dn(&mut self, dn: &str, context: Context) -> Result<Option<LocalUser>> {
        let key = dn_key(dn);
        let found = self
            .working
            .table(context)
            .iter()
            .filter(|u| u.dn.as_deref().map(dn_key).as_deref() == Some(key.as_str()))
            .min_by_key(|u| (u.deleted, u.disabled, u.uid))
            .cloned();
        Ok(found)
    }

    async fn list_linked(
        &mut self,
        configuration_uid: u32,
        context: Context,
    ) -> Result<Vec<LocalUser>> {
        Ok(self
            .working
            .table(context)
            .iter()
            .filter(|u| u.configuration_uid == Some(configuration_uid) && u.is_directory_linked())
            .cloned()
            .collect())
    }

    async fn upsert(
        &mut self,
        merged: &MergedUser,
        configuration_uid: u32,
        context: Context,
    ) -> Result<LocalUser> {
        match merged.uid {
            Some(uid) => {
                let user = self.working.user_mut(uid, context)?;
                user.dn = Some(merged.dn.clone());
                user.configuration_uid = Some(configuration_uid);
                user.fields = merged.fields.clone();
                Ok(user.clone())
            }
            None => {
                let user = LocalUser {
                    uid: 0,
                    dn: Some(merged.dn.clone()),
                    configuration_uid: Some(configuration_uid),
                    disabled: false,
                    deleted: false,
                    fields: merged.fields.clone(),
                };
                Ok(self.working.insert(user, context))
            }
        }
    }

    async fn disable(&mut self, user: &LocalUser, context: Context) -> Result<()> {
        self.working.user_mut(user.uid, context)?.disabled = true;
        Ok(())
    }

    async fn soft_delete(&mut self, user: &LocalUser, context: Context) -> Result<()> {
        self.working.user_mut(user.uid, context)?.deleted = true;
        Ok(())
    }

    async fn enable(&mut self, user: &LocalUser, context: Context) -> Result<()> {
        self.working.user_mut(user.uid, context)?.disabled = false;
        Ok(())
    }

    async fn undelete(&mut self, user: &LocalUser, context: Context) -> Result<()> {
        self.working.user_mut(user.uid, context)?.deleted = false;
        Ok(())
    }
}

#[async_trait]
impl UserTransaction for MemoryUserTransaction {
    async fn commit(self: Box<Self>) -> Result<()> {
        let MemoryUserTransaction { shared, working } = *self;
        *shared.lock().await = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
