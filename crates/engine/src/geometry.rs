//! Axis-aligned rectangle primitives and the set algebra the redraw
//! strategies are built on. World coordinates are Cartesian (y grows up).

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle anchored at its bottom-left corner.
///
/// `w` and `h` are assumed non-negative by every operation here; degenerate
/// rectangles are the caller's responsibility.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn top(&self) -> f32 {
        self.y + self.h
    }

    /// Boundary-inclusive point membership.
    pub fn contains(&self, point: Vec2) -> bool {
        self.x <= point.x && point.x <= self.right() && self.y <= point.y && point.y <= self.top()
    }

    /// Separating-axis overlap test. Rectangles that merely share an edge do
    /// not overlap. Symmetric in its arguments.
    pub fn overlaps(&self, other: &Rect) -> bool {
        let separated_horizontally = self.right() <= other.x || other.right() <= self.x;
        let separated_vertically = self.top() <= other.y || other.top() <= self.y;
        !(separated_horizontally || separated_vertically)
    }

    /// The common region of two rectangles, or `None` when there is none.
    /// Rectangles sharing only an edge yield a zero-area `Some`.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let top = self.top().min(other.top());
        if right < x || top < y {
            return None;
        }
        Some(Rect::new(x, y, right - x, top - y))
    }

    /// The smallest rectangle containing both inputs.
    pub fn union_bound(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let top = self.top().max(other.top());
        Rect::new(x, y, right - x, top - y)
    }

    pub fn move_by(&mut self, dx: f32, dy: f32) {
        self.x += dx;
        self.y += dy;
    }

    pub fn move_to(&mut self, x: f32, y: f32) {
        self.x = x;
        self.y = y;
    }
}

/// A flat collection of rectangles, closed under clipping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RectSet {
    rects: Vec<Rect>,
}

impl RectSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, rect: Rect) {
        self.rects.push(rect);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rect> {
        self.rects.iter()
    }

    pub fn len(&self) -> usize {
        self.rects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    /// Every non-empty member-wise intersection with `clip`. Result order is
    /// the insertion order of `self`.
    pub fn intersect_rect(&self, clip: &Rect) -> RectSet {
        let rects = self
            .rects
            .iter()
            .filter_map(|rect| rect.intersect(clip))
            .collect();
        RectSet { rects }
    }

    /// Every non-empty pairwise intersection between the two sets, flattened.
    pub fn intersect_set(&self, other: &RectSet) -> RectSet {
        let mut rects = Vec::new();
        for rect in &self.rects {
            for other_rect in &other.rects {
                if let Some(common) = rect.intersect(other_rect) {
                    rects.push(common);
                }
            }
        }
        RectSet { rects }
    }

    /// The smallest rectangle containing every member, if any.
    pub fn union_bound(&self) -> Option<Rect> {
        let mut rects = self.rects.iter();
        let first = *rects.next()?;
        Some(rects.fold(first, |bound, rect| bound.union_bound(rect)))
    }
}

impl From<Vec<Rect>> for RectSet {
    fn from(rects: Vec<Rect>) -> Self {
        Self { rects }
    }
}
