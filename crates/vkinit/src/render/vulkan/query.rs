//! Count-then-fill capability queries

use ash::vk;

use super::error::{VulkanError, VulkanResult};

/// Run a two-call list query.
///
/// The first call asks for the element count, the second fills a buffer of
/// exactly that size. The returned list is sized by the count the *second*
/// call reports, which may be smaller than the first. `INCOMPLETE` is not an
/// error; any other non-success code is, and is never retried.
pub fn enumerate<T, F>(what: &'static str, mut call: F) -> VulkanResult<Vec<T>>
where
    T: Default + Clone,
    F: FnMut(&mut u32, Option<&mut [T]>) -> vk::Result,
{
    let mut count = 0u32;
    check(what, call(&mut count, None))?;

    let mut items = vec![T::default(); count as usize];
    if items.is_empty() {
        return Ok(items);
    }

    let mut written = count;
    check(what, call(&mut written, Some(&mut items)))?;
    items.truncate(written as usize);

    log::trace!("Queried {} {}", items.len(), what);
    Ok(items)
}

fn check(what: &'static str, result: vk::Result) -> VulkanResult<()> {
    match result {
        vk::Result::SUCCESS | vk::Result::INCOMPLETE => Ok(()),
        failure => Err(VulkanError::query(what, failure)),
    }
}
