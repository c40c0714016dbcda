#![warn(clippy::pedantic)]

pub mod global;
pub mod presenter;

use anyhow::Result as AnyResult;
use draftboard_core::document::Document;
use draftboard_core::scene::NodeKind;

#[cfg(feature = "dhat_heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

/// Fill a fresh document with one of every kind of item, the last being a group.
fn populate(document: &Document) -> AnyResult<Vec<draftboard_core::NodeID>> {
    use strum::IntoEnumIterator;
    let kinds = NodeKind::iter()
        .filter(|kind| *kind != NodeKind::Group)
        .chain(std::iter::once(NodeKind::Group));
    document.write_with(|outline| -> AnyResult<Vec<_>> {
        let ids = kinds
            .enumerate()
            .map(|(i, kind)| outline.create_node(kind, format!("Item {}", i + 1), None))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    })
}

fn main() -> AnyResult<()> {
    let has_term = std::io::IsTerminal::is_terminal(&std::io::stdin());
    // Log to a terminal, if available. Else, log to "log.out" in the working directory.
    if has_term {
        env_logger::builder()
            .filter_level(log::LevelFilter::Trace)
            .init();
    } else {
        let _ = simple_logging::log_to_file("log.out", log::LevelFilter::Trace);
    }
    #[cfg(feature = "dhat_heap")]
    let _profiler = {
        log::trace!("Installed dhat");
        dhat::Profiler::new_heap()
    };

    let preferences = global::preferences::Preferences::get();
    log::set_max_level(preferences.settings.log_level);
    if preferences.should_write_defaults() {
        if let Err(e) = preferences.save() {
            log::warn!("Failed to save preferences:\n{e:?}");
        }
    }

    let provider = global::provider();
    let mut changes = provider.change_listener();
    let id = provider.insert_new(preferences.settings.outline.clone());

    let outline = provider
        .inspect(id, |document| -> AnyResult<Vec<String>> {
            let items = populate(document)?;
            let mut presenter = presenter::OutlinePresenter::attach(document);

            // Gather the first two items into the group at the bottom, then hide it.
            let (group, loose) = items
                .split_last()
                .ok_or_else(|| anyhow::anyhow!("demo document is empty"))?;
            document.write_with(|outline| -> AnyResult<()> {
                outline.handle_drop(&loose[..2], Some(*group), 0)?;
                let propagation = outline.toggle_visibility(*group)?;
                log::info!(
                    "hiding {} also hid {} item(s)",
                    propagation.root,
                    propagation.affected.len()
                );
                Ok(())
            })?;
            presenter.pump(document);
            Ok(presenter.render(document))
        })
        .ok_or_else(|| anyhow::anyhow!("{id} vanished"))??;

    for line in &outline {
        println!("{line}");
    }
    while let Ok(message) = changes.try_recv() {
        log::debug!("{message:?}");
    }
    Ok(())
}
