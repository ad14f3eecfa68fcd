const LOOPED_SUFFIX: &str = "_looped_001";

/// Frame names of an animation, generated by substituting a zero-padded
/// counter for the `01`/`001` in `walk_01.png` or `walk_001.png`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FramePattern {
    prefix: String,
    digits: usize,
    suffix: String,
}

impl FramePattern {
    pub(crate) fn from_first_frame(name: &str) -> Option<Self> {
        [("_01.", 2), ("_001.", 3)]
            .into_iter()
            .find_map(|(marker, digits)| {
                name.find(marker).map(|index| Self {
                    prefix: name[..=index].to_string(),
                    digits,
                    suffix: name[index + marker.len() - 1..].to_string(),
                })
            })
    }

    pub(crate) fn frame_name(&self, index: usize) -> String {
        format!(
            "{}{index:0width$}{}",
            self.prefix,
            self.suffix,
            width = self.digits
        )
    }
}

/// `walk_001.png` becomes `walk_001_looped_001.png`.
pub(crate) fn looped_variant(name: &str) -> Option<String> {
    let dot = name.rfind('.')?;
    Some(format!("{}{LOOPED_SUFFIX}{}", &name[..dot], &name[dot..]))
}

/// Frames of `anim_name` present in `frames`, counted from 1 until the first
/// missing one. The looped variant wins when its first frame exists.
pub(crate) fn resolve_animation_frames(anim_name: &str, frames: &SpriteFrameCache) -> Vec<String> {
    let looped = looped_variant(anim_name).filter(|looped| frames.contains(looped));
    let first_frame = looped.as_deref().unwrap_or(anim_name);
    let Some(pattern) = FramePattern::from_first_frame(first_frame) else {
        return if frames.contains(first_frame) {
            vec![first_frame.to_string()]
        } else {
            Vec::new()
        };
    };

    (1..)
        .map(|index| pattern.frame_name(index))
        .take_while(|name| frames.contains(name))
        .collect()
}

/// Replaces the animation on `node`. Returns the number of frames found;
/// nothing runs when there are none.
pub(crate) fn run_animation(
    world: &mut SceneWorld,
    node: NodeId,
    anim_name: &str,
    fps: f32,
    looping: bool,
) -> usize {
    world.stop_animation(node);
    let names = resolve_animation_frames(anim_name, world.assets().sprite_frames());
    if names.is_empty() || !(fps.is_finite() && fps > 0.0) {
        debug!(animation = anim_name, "animation_frames_missing");
        return 0;
    }

    let frame_count = names.len();
    let playback = AnimationPlayback::new(Animation::new(names, fps.recip()), looping);
    if world.run_animation(node, playback) {
        frame_count
    } else {
        0
    }
}
