use crate::security::is_not_blacklisted;
use crate::services::{PageContext, PlatformError, PlatformService, ServiceResult};

pub fn fatal_error<S: PlatformService>(
    service: &S,
    ctx: &mut PageContext,
    message: &str,
) -> ServiceResult<()> {
    is_not_blacklisted(service, ctx, false)?;
    ctx.context.set("error_message", message);
    Err(PlatformError::Validation(message.into()))
}
