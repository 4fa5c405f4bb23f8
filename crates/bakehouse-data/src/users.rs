//! Till operators and passcode sign-in

use crate::{SessionSigner, User, insert_returning_id, require_text};
use bakehouse_core::{BakehouseError, ProcedureName, Result};
use bakehouse_gateway::{ProcedureGateway, procedure_params};
use ring::digest;

const INSERT_USER: ProcedureName = ProcedureName::new("dbo.InsertUser");
const GET_USER_BY_PASSCODE: ProcedureName = ProcedureName::new("dbo.GetUserByPasscode");
const GET_USER_BY_ID: ProcedureName = ProcedureName::new("dbo.GetUserById");

const PASSCODE_LEN: std::ops::RangeInclusive<usize> = 4..=8;

/// A new operator. The passcode is hashed before it leaves this module.
#[derive(Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub role: String,
    pub passcode: String,
}

impl std::fmt::Debug for NewUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewUser")
            .field("name", &self.name)
            .field("role", &self.role)
            .field("passcode", &"<redacted>")
            .finish()
    }
}

struct UserRecord<'a> {
    name: &'a str,
    role: &'a str,
    passcode_hash: String,
}

procedure_params!(UserRecord<'_> {
    name => "Name",
    role => "Role",
    passcode_hash => "PasscodeHash",
});

struct PasscodeKey {
    passcode_hash: String,
}

procedure_params!(PasscodeKey { passcode_hash => "PasscodeHash" });

struct UserKey {
    user_id: i64,
}

procedure_params!(UserKey { user_id => "UserId" });

/// Lowercase hex SHA-256 of a passcode, the form the store keeps
pub fn hash_passcode(passcode: &str) -> String {
    hex::encode(digest::digest(&digest::SHA256, passcode.as_bytes()).as_ref())
}

fn check_passcode(passcode: &str) -> Result<()> {
    if !PASSCODE_LEN.contains(&passcode.len()) || !passcode.bytes().all(|b| b.is_ascii_digit()) {
        return Err(BakehouseError::InvalidInput(format!(
            "passcode must be {} to {} digits",
            PASSCODE_LEN.start(),
            PASSCODE_LEN.end()
        )));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct UserData {
    gateway: ProcedureGateway,
}

impl UserData {
    pub fn new(gateway: ProcedureGateway) -> Self {
        Self { gateway }
    }

    pub async fn insert(&self, user: &NewUser) -> Result<i64> {
        require_text("user name", &user.name)?;
        require_text("role", &user.role)?;
        check_passcode(&user.passcode)?;
        let record = UserRecord {
            name: &user.name,
            role: &user.role,
            passcode_hash: hash_passcode(&user.passcode),
        };
        insert_returning_id(&self.gateway, INSERT_USER, &record).await
    }

    pub async fn get(&self, user_id: i64) -> Result<Option<User>> {
        self.gateway
            .load_first(GET_USER_BY_ID, &UserKey { user_id })
            .await
    }

    /// The active operator with this passcode, if any
    pub async fn find_by_passcode(&self, passcode: &str) -> Result<Option<User>> {
        if check_passcode(passcode).is_err() {
            return Ok(None);
        }
        let key = PasscodeKey {
            passcode_hash: hash_passcode(passcode),
        };
        let user: Option<User> = self.gateway.load_first(GET_USER_BY_PASSCODE, &key).await?;
        Ok(user.filter(|u| u.is_active))
    }

    /// Sign an operator in and issue their session cookie
    pub async fn sign_in(
        &self,
        signer: &SessionSigner,
        passcode: &str,
    ) -> Result<Option<(User, String)>> {
        let Some(user) = self.find_by_passcode(passcode).await? else {
            tracing::warn!("sign-in rejected");
            return Ok(None);
        };
        tracing::info!(user_id = user.user_id, role = %user.role, "operator signed in");
        let cookie = signer.sign(user.user_id);
        Ok(Some((user, cookie)))
    }

    /// The operator a session cookie belongs to, while they remain active
    pub async fn from_session(&self, signer: &SessionSigner, cookie: &str) -> Result<Option<User>> {
        let Some(user_id) = signer.verify(cookie) else {
            return Ok(None);
        };
        Ok(self.get(user_id).await?.filter(|u| u.is_active))
    }
}
