pub(crate) mod signing_session;
