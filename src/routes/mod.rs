/// Router Module Index
///
/// Routes are split by access level so that authentication is applied as a layer on
/// a whole module rather than remembered per handler.

/// Routes reachable without a token: service probes, registration, login, and
/// read-only access to published articles and tags.
pub mod public;

/// Routes guarded by `auth_middleware`; every handler here also receives the
/// resolved `AuthUser`.
pub mod authenticated;
