//! Typed ULID IDs used by the intake service.

use crate::macros::define_id;

define_id!(WorkOrderId, "wo");
define_id!(RequestId, "req");
