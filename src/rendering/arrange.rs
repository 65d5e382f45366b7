/// Depth arrangement of a generated session
///
/// Quadrant buckets are first chained back to front into one list. Each
/// bucket is then compared against the bucket right in front of it: a struct
/// in the next bucket that sits behind one in the current bucket is spliced in
/// ahead of it. Only neighbouring buckets are compared, so the pass is linear
/// in practice and never a full topological sort.
use super::paint::{BoundBox, PaintIndex, PaintSession, QuadrantFlags, ROOT};
use crate::count_call;
use crate::perf::FUNCTION_COUNTERS;

/// Whether box `a` covers box `b` from the camera under `rotation`, so `b`
/// has to be drawn first.
///
/// Rotations 1 and 2 flip the x depth axis, rotations 2 and 3 flip y. On a
/// forward axis `a` reaches `b` when its end is past `b`'s start, on a flipped
/// axis when its start is before `b`'s end.
#[inline]
pub fn in_front_of(rotation: u8, a: &BoundBox, b: &BoundBox) -> bool {
    let (flip_x, flip_y) = match rotation & 3 {
        0 => (false, false),
        1 => (true, false),
        2 => (true, true),
        _ => (false, true),
    };
    let reach = |flip: bool, a0: i32, a1: i32, b0: i32, b1: i32| {
        if flip { a0 <= b1 } else { a1 >= b0 }
    };
    let ahead = |flip: bool, a0: i32, a1: i32, b0: i32, b1: i32| {
        if flip { a1 > b0 } else { a0 < b1 }
    };

    let reach_x = reach(flip_x, a.x, a.x_end, b.x, b.x_end);
    let reach_y = reach(flip_y, a.y, a.y_end, b.y, b.y_end);
    let ahead_x = ahead(flip_x, a.x, a.x_end, b.x, b.x_end);
    let ahead_y = ahead(flip_y, a.y, a.y_end, b.y, b.y_end);

    a.z_end >= b.z && reach_y && reach_x && !(a.z < b.z_end && ahead_y && ahead_x)
}

impl PaintSession {
    #[inline]
    fn next_of(&self, index: PaintIndex) -> Option<PaintIndex> {
        self.structs[index as usize].next_quadrant
    }

    #[inline]
    fn quadrant_of(&self, index: PaintIndex) -> u16 {
        self.structs[index as usize].quadrant_index
    }

    /// Link the session's structs into draw order. Bucket links are reused
    /// for the chain, so this runs once per session after generation.
    pub fn arrange(&mut self) {
        self.structs[ROOT as usize].next_quadrant = None;
        if self.quadrant_back > self.quadrant_front {
            return;
        }

        // --- PHASE 1: CHAIN BUCKETS BACK TO FRONT ---
        let mut tail = ROOT;
        for quadrant in self.quadrant_back..=self.quadrant_front {
            let Some(head) = self.quadrants[quadrant] else {
                continue;
            };
            self.structs[tail as usize].next_quadrant = Some(head);
            let mut cursor = head;
            while let Some(next) = self.next_of(cursor) {
                cursor = next;
            }
            tail = cursor;
        }

        // --- PHASE 2: SORT NEIGHBOURING BUCKETS ---
        let back = self.quadrant_back as u16;
        let mut cache = self.arrange_quadrant(ROOT, back, QuadrantFlags::NEXT);
        for quadrant in self.quadrant_back + 1..self.quadrant_front {
            cache = self.arrange_quadrant(cache, quadrant as u16, QuadrantFlags::empty());
        }
    }

    /// Sort bucket `quadrant` against bucket `quadrant + 1`, starting the walk
    /// at `start`. Returns the node later walks can resume from.
    fn arrange_quadrant(&mut self, start: PaintIndex, quadrant: u16, flag: QuadrantFlags) -> PaintIndex {
        let rotation = self.params.rotation;

        let mut ps;
        let mut ps_next = start;
        loop {
            ps = ps_next;
            match self.next_of(ps) {
                None => return ps,
                Some(next) => ps_next = next,
            }
            if quadrant <= self.quadrant_of(ps_next) {
                break;
            }
        }
        let cache = ps;

        // Tag the run of structs in this bucket and the next one
        let mut cursor = ps;
        while let Some(next) = self.next_of(cursor) {
            cursor = next;
            let qi = self.quadrant_of(cursor);
            let node = &mut self.structs[cursor as usize];
            if qi > quadrant + 1 {
                node.quadrant_flags = QuadrantFlags::BIGGER;
                break;
            } else if qi == quadrant + 1 {
                node.quadrant_flags = QuadrantFlags::NEXT | QuadrantFlags::IDENTICAL;
            } else if qi == quadrant {
                node.quadrant_flags = flag | QuadrantFlags::IDENTICAL;
            }
        }

        loop {
            let mut next;
            loop {
                next = match self.next_of(ps) {
                    None => return cache,
                    Some(n) => n,
                };
                let flags = self.structs[next as usize].quadrant_flags;
                if flags.contains(QuadrantFlags::BIGGER) {
                    return cache;
                }
                if flags.contains(QuadrantFlags::IDENTICAL) {
                    break;
                }
                ps = next;
            }

            self.structs[next as usize].quadrant_flags.remove(QuadrantFlags::IDENTICAL);
            let anchor = ps;
            let initial = self.structs[next as usize].bounds;

            let mut current = next;
            loop {
                ps = current;
                let Some(candidate) = self.next_of(current) else {
                    break;
                };
                current = candidate;
                let flags = self.structs[candidate as usize].quadrant_flags;
                if flags.contains(QuadrantFlags::BIGGER) {
                    break;
                }
                if !flags.contains(QuadrantFlags::NEXT) {
                    continue;
                }
                if in_front_of(rotation, &initial, &self.structs[candidate as usize].bounds) {
                    // Move the candidate right after the anchor
                    let after_candidate = self.next_of(candidate);
                    self.structs[ps as usize].next_quadrant = after_candidate;
                    let after_anchor = self.next_of(anchor);
                    self.structs[anchor as usize].next_quadrant = Some(candidate);
                    self.structs[candidate as usize].next_quadrant = after_anchor;
                    current = ps;
                    count_call!(FUNCTION_COUNTERS.arrange_swaps);
                }
            }

            ps = anchor;
        }
    }

    /// Struct indices in draw order: each chain entry followed by its children
    pub fn draw_order(&self) -> Vec<PaintIndex> {
        let mut order = Vec::with_capacity(self.structs.len().saturating_sub(1));
        let mut cursor = self.next_of(ROOT);
        while let Some(index) = cursor {
            order.push(index);
            let mut child = self.structs[index as usize].children;
            while let Some(c) = child {
                order.push(c);
                child = self.structs[c as usize].children;
            }
            cursor = self.next_of(index);
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sprite::{ImageId, Sprite, SpriteStore};
    use crate::viewport::{ScreenRect, ViewFlags, ViewParams, ZoomLevel};
    use glam::IVec3;

    fn session(rotation: u8) -> (PaintSession, SpriteStore, ImageId) {
        let mut store = SpriteStore::new(crate::sprite::procedural::demo_palette());
        let image = store.add(Sprite::bitmap(2, 2, -1, -1, vec![1; 4]));
        let params = ViewParams {
            zoom: ZoomLevel::default(),
            rotation,
            flags: ViewFlags::empty(),
            clip_height: i32::MAX,
        };
        (PaintSession::new(ScreenRect::new(-4096, -4096, 4096, 4096), params), store, image)
    }

    fn bb(x: i32, y: i32, z: i32, sx: i32, sy: i32, sz: i32) -> BoundBox {
        BoundBox::new(IVec3::new(x, y, z), IVec3::new(sx, sy, sz))
    }

    #[test]
    fn test_higher_box_covers_lower() {
        let low = bb(0, 0, 0, 32, 32, 8);
        let high = bb(0, 0, 16, 32, 32, 8);
        for r in 0..4 {
            assert!(in_front_of(r, &high, &low), "rotation {r}");
            assert!(!in_front_of(r, &low, &high), "rotation {r}");
        }
    }

    #[test]
    fn test_cover_depends_on_rotation() {
        // Larger x is nearer the camera for rotations 0 and 3
        let low_x = bb(0, 0, 0, 16, 32, 8);
        let high_x = bb(16, 0, 0, 16, 32, 8);
        assert!(in_front_of(0, &high_x, &low_x));
        assert!(in_front_of(3, &high_x, &low_x));
        assert!(!in_front_of(1, &high_x, &low_x));
        assert!(!in_front_of(2, &high_x, &low_x));
        assert!(in_front_of(1, &low_x, &high_x));
        assert!(in_front_of(2, &low_x, &high_x));
    }

    #[test]
    fn test_empty_session_arranges_to_nothing() {
        let (mut s, _, _) = session(0);
        s.arrange();
        assert!(s.draw_order().is_empty());
    }

    #[test]
    fn test_buckets_drawn_back_to_front() {
        let (mut s, store, image) = session(0);
        let front = s.add_parent(&store, image, IVec3::ZERO, bb(320, 320, 0, 8, 8, 8)).unwrap();
        let back = s.add_parent(&store, image, IVec3::ZERO, bb(0, 0, 0, 8, 8, 8)).unwrap();
        let middle = s.add_parent(&store, image, IVec3::ZERO, bb(96, 96, 0, 8, 8, 8)).unwrap();
        s.arrange();
        assert_eq!(s.draw_order(), vec![back, middle, front]);
    }

    #[test]
    fn test_struct_under_bridge_moves_first() {
        let (mut s, store, image) = session(0);
        let bridge = s.add_parent(&store, image, IVec3::ZERO, bb(0, 0, 16, 64, 64, 2)).unwrap();
        let under = s.add_parent(&store, image, IVec3::ZERO, bb(20, 20, 0, 8, 8, 8)).unwrap();
        assert_eq!(s.structs[bridge as usize].quadrant_index, 0);
        assert_eq!(s.structs[under as usize].quadrant_index, 1);
        s.arrange();
        assert_eq!(s.draw_order(), vec![under, bridge]);
    }

    #[test]
    fn test_box_on_slab_keeps_bucket_order() {
        let (mut s, store, image) = session(0);
        let slab = s.add_parent(&store, image, IVec3::ZERO, bb(0, 0, 0, 64, 64, 2)).unwrap();
        let on_top = s.add_parent(&store, image, IVec3::ZERO, bb(20, 20, 2, 8, 8, 8)).unwrap();
        s.arrange();
        assert_eq!(s.draw_order(), vec![slab, on_top]);
    }

    #[test]
    fn test_children_follow_parent() {
        let (mut s, store, image) = session(0);
        let parent = s.add_parent(&store, image, IVec3::ZERO, bb(0, 0, 0, 8, 8, 8)).unwrap();
        let child = s.add_child(&store, image, IVec3::ZERO, bb(0, 0, 0, 8, 8, 8)).unwrap();
        let other = s.add_parent(&store, image, IVec3::ZERO, bb(64, 64, 0, 8, 8, 8)).unwrap();
        s.arrange();
        assert_eq!(s.draw_order(), vec![parent, child, other]);
    }

    #[test]
    fn test_arrange_is_deterministic() {
        let build = || {
            let (mut s, store, image) = session(1);
            for i in 0..60 {
                let x = (i * 37) % 200;
                let y = (i * 53) % 200;
                s.add_parent(&store, image, IVec3::ZERO, bb(x, y, (i % 5) * 8, 12, 12, 8));
            }
            s.arrange();
            s.draw_order()
        };
        let first = build();
        assert_eq!(first.len(), 60);
        assert_eq!(first, build());
    }
}
