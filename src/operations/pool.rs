use super::Call;
use crate::config::PoolConfig;
use crate::error::Result;

pub(super) fn create_pool(call: &mut Call<'_, '_>, pool: &PoolConfig) -> Result<()> {
    let owner = call.sender();
    call.queue.create_pool(call.repo, &owner, pool, call.effects)
}
