//! Typed names for every fixture kind a scenario creates.

use crate::define_name;

// =============================================================================
// Tenancy
// =============================================================================

define_name!(OrgName, "org");
define_name!(SpaceName, "space");
define_name!(UserName, "user");

// =============================================================================
// Applications and Routing
// =============================================================================

define_name!(AppName, "app");
define_name!(RouteHost, "host");

// =============================================================================
// Services
// =============================================================================

define_name!(BrokerName, "broker");
define_name!(ServiceName, "service");
define_name!(PlanName, "plan");
define_name!(ServiceInstanceName, "svc");
