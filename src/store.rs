// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 handledir contributors

//! In-memory account and identity store.
//!
//! Uniqueness of account names and emails is enforced through secondary
//! indexes; violations surface as [`StoreError`] variants that handlers map
//! to stable domain error codes. Access is externally synchronized by the
//! `RwLock` in `AppState`; no method spans more than one logical statement.

use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;

use crate::models::{
    Account, ContactMessage, Identity, IdentityStatus, Network, VerificationRequest,
};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("an account with this name already exists")]
    DuplicateName,
    #[error("an account with this email already exists")]
    DuplicateEmail,
    #[error("account not found")]
    UnknownAccount,
    #[error("identity not found")]
    UnknownIdentity,
}

#[derive(Default)]
pub struct InMemoryStore {
    accounts: HashMap<Uuid, Account>,
    /// name -> account id
    names: HashMap<String, Uuid>,
    /// email -> account id
    emails: HashMap<String, Uuid>,
    identities: HashMap<Uuid, Identity>,
    verification_requests: Vec<VerificationRequest>,
    contact_messages: Vec<ContactMessage>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------------------------------------------------
    // Accounts
    // -------------------------------------------------------------------------

    pub fn create_account(
        &mut self,
        name: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Result<Account, StoreError> {
        let name = name.into();
        let email = email.into();
        if self.names.contains_key(&name) {
            return Err(StoreError::DuplicateName);
        }
        if self.emails.contains_key(&email) {
            return Err(StoreError::DuplicateEmail);
        }

        let account = Account {
            id: Uuid::new_v4(),
            name: name.clone(),
            email: email.clone(),
            password_hash: password_hash.into(),
            created_at: Utc::now(),
        };
        self.names.insert(name, account.id);
        self.emails.insert(email, account.id);
        self.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    pub fn account_by_name(&self, name: &str) -> Option<&Account> {
        self.names.get(name).and_then(|id| self.accounts.get(id))
    }

    pub fn account_by_email(&self, email: &str) -> Option<&Account> {
        self.emails.get(email).and_then(|id| self.accounts.get(id))
    }

    /// Live-state check for session validation: the claimed `(name, email)`
    /// pair must still match an existing account row.
    pub fn account_matches(&self, name: &str, email: &str) -> bool {
        self.account_by_name(name)
            .map(|account| account.email == email)
            .unwrap_or(false)
    }

    /// Apply a profile update, keeping the name and email indexes
    /// consistent. Uniqueness of a changed name or email is re-checked.
    pub fn update_account(
        &mut self,
        current_name: &str,
        new_name: Option<String>,
        new_email: Option<String>,
        new_password_hash: Option<String>,
    ) -> Result<Account, StoreError> {
        let id = *self.names.get(current_name).ok_or(StoreError::UnknownAccount)?;

        if let Some(name) = &new_name {
            if name != current_name && self.names.contains_key(name) {
                return Err(StoreError::DuplicateName);
            }
        }
        let current_email = self
            .accounts
            .get(&id)
            .map(|a| a.email.clone())
            .ok_or(StoreError::UnknownAccount)?;
        if let Some(email) = &new_email {
            if *email != current_email && self.emails.contains_key(email) {
                return Err(StoreError::DuplicateEmail);
            }
        }

        let account = self.accounts.get_mut(&id).ok_or(StoreError::UnknownAccount)?;
        if let Some(name) = new_name {
            self.names.remove(&account.name);
            self.names.insert(name.clone(), id);
            account.name = name;
        }
        if let Some(email) = new_email {
            self.emails.remove(&account.email);
            self.emails.insert(email.clone(), id);
            account.email = email;
        }
        if let Some(hash) = new_password_hash {
            account.password_hash = hash;
        }
        Ok(account.clone())
    }

    /// Delete an account and every identity it owns.
    pub fn delete_account(&mut self, name: &str) -> Result<(), StoreError> {
        let id = *self.names.get(name).ok_or(StoreError::UnknownAccount)?;
        let account = self.accounts.remove(&id).ok_or(StoreError::UnknownAccount)?;
        self.names.remove(&account.name);
        self.emails.remove(&account.email);
        self.identities.retain(|_, identity| identity.owner_user_id != id);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Identities
    // -------------------------------------------------------------------------

    pub fn create_identity(
        &mut self,
        owner_user_id: Uuid,
        network: Network,
        platform_label: Option<String>,
        external_name: impl Into<String>,
        description: impl Into<String>,
    ) -> Identity {
        let identity = Identity {
            id: Uuid::new_v4(),
            owner_user_id,
            network,
            platform_label,
            external_name: external_name.into(),
            description: description.into(),
            status: IdentityStatus::Unverified,
        };
        self.identities.insert(identity.id, identity.clone());
        identity
    }

    /// Look up an identity by its id, scoped to a network path segment.
    pub fn identity(&self, network: Network, id: Uuid) -> Option<&Identity> {
        self.identities
            .get(&id)
            .filter(|identity| identity.network == network)
    }

    /// Find an owner's identity by its external handle.
    pub fn identity_by_handle(
        &self,
        owner_user_id: Uuid,
        network: Network,
        external_name: &str,
    ) -> Option<&Identity> {
        self.identities.values().find(|identity| {
            identity.owner_user_id == owner_user_id
                && identity.network == network
                && identity.external_name == external_name
        })
    }

    pub fn update_identity_description(
        &mut self,
        id: Uuid,
        description: impl Into<String>,
    ) -> Result<Identity, StoreError> {
        let identity = self.identities.get_mut(&id).ok_or(StoreError::UnknownIdentity)?;
        identity.description = description.into();
        Ok(identity.clone())
    }

    pub fn set_identity_status(
        &mut self,
        id: Uuid,
        status: IdentityStatus,
    ) -> Result<Identity, StoreError> {
        let identity = self.identities.get_mut(&id).ok_or(StoreError::UnknownIdentity)?;
        identity.status = status;
        Ok(identity.clone())
    }

    pub fn delete_identity(&mut self, network: Network, id: Uuid) -> Result<(), StoreError> {
        if self.identity(network, id).is_none() {
            return Err(StoreError::UnknownIdentity);
        }
        self.identities.remove(&id);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Verification requests & contact messages
    // -------------------------------------------------------------------------

    pub fn push_verification_request(&mut self, request: VerificationRequest) {
        self.verification_requests.push(request);
    }

    pub fn verification_requests(&self) -> &[VerificationRequest] {
        &self.verification_requests
    }

    pub fn push_contact_message(
        &mut self,
        email: Option<String>,
        message: impl Into<String>,
    ) -> ContactMessage {
        let record = ContactMessage {
            id: Uuid::new_v4(),
            email,
            message: message.into(),
            received_at: Utc::now(),
        };
        self.contact_messages.push(record.clone());
        record
    }

    pub fn contact_messages(&self) -> &[ContactMessage] {
        &self.contact_messages
    }
}
