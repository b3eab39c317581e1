use lotledger_core::UserId;

/// Acting-user context for a request.
///
/// Every mutating ledger operation carries this identity for audit
/// attribution. It is derived from the validated bearer token and must be
/// present for all protected routes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ActorContext {
    user_id: UserId,
}

impl ActorContext {
    pub fn new(user_id: UserId) -> Self {
        Self { user_id }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }
}
