use crate::errors::Result;
use crate::flownode::model::GatewayInstance;
use crate::flownode::services::GatewayInstanceService;

/// Persist a gateway within the caller's transaction
///
/// # Errors
///
/// Store failures.
pub fn create_gateway_instance(
    gateways: &dyn GatewayInstanceService,
    gateway: &GatewayInstance,
) -> Result<()> {
    gateways.create_gateway_instance(gateway)
}
