//! Sorting and paging value types shared by every repository port.

use serde::{Deserialize, Serialize};

/// Sort direction for a single property.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn is_ascending(&self) -> bool {
        matches!(self, Direction::Asc)
    }

    pub fn reverse(self) -> Self {
        match self {
            Direction::Asc => Direction::Desc,
            Direction::Desc => Direction::Asc,
        }
    }
}

/// Ordering on one property path (dotted for nested fields).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Order {
    pub property: String,
    pub direction: Direction,
    #[serde(default)]
    pub ignore_case: bool,
}

impl Order {
    pub fn asc<S: Into<String>>(property: S) -> Self {
        Self {
            property: property.into(),
            direction: Direction::Asc,
            ignore_case: false,
        }
    }

    pub fn desc<S: Into<String>>(property: S) -> Self {
        Self {
            property: property.into(),
            direction: Direction::Desc,
            ignore_case: false,
        }
    }

    /// Compare string values case-insensitively for this order.
    pub fn ignoring_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }
}

/// Ordered list of [`Order`]s. Earlier orders take precedence.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sort {
    orders: Vec<Order>,
}

impl Sort {
    pub fn unsorted() -> Self {
        Self::default()
    }

    /// Ascending sort on the given properties.
    pub fn by<I, S>(properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            orders: properties.into_iter().map(Order::asc).collect(),
        }
    }

    pub fn by_orders<I: IntoIterator<Item = Order>>(orders: I) -> Self {
        Self {
            orders: orders.into_iter().collect(),
        }
    }

    /// Append the orders of `other` after ours.
    pub fn and(mut self, other: Sort) -> Self {
        self.orders.extend(other.orders);
        self
    }

    pub fn ascending(self) -> Self {
        self.with_direction(Direction::Asc)
    }

    pub fn descending(self) -> Self {
        self.with_direction(Direction::Desc)
    }

    fn with_direction(mut self, direction: Direction) -> Self {
        for order in &mut self.orders {
            order.direction = direction;
        }
        self
    }

    pub fn is_sorted(&self) -> bool {
        !self.orders.is_empty()
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn order_for(&self, property: &str) -> Option<&Order> {
        self.orders.iter().find(|o| o.property == property)
    }
}

/// Rejected paging parameters.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PageableError {
    #[error("page size must not be less than one")]
    ZeroPageSize,
}

/// Paging request: either everything at once, or a zero-based page index
/// with a fixed page size.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Pageable {
    Unpaged {
        #[serde(default)]
        sort: Sort,
    },
    Paged {
        page: usize,
        size: usize,
        #[serde(default)]
        sort: Sort,
    },
}

impl Default for Pageable {
    fn default() -> Self {
        Self::unpaged()
    }
}

impl Pageable {
    pub fn unpaged() -> Self {
        Pageable::Unpaged {
            sort: Sort::unsorted(),
        }
    }

    pub fn of(page: usize, size: usize) -> Result<Self, PageableError> {
        Self::of_sorted(page, size, Sort::unsorted())
    }

    pub fn of_sorted(page: usize, size: usize, sort: Sort) -> Result<Self, PageableError> {
        if size == 0 {
            return Err(PageableError::ZeroPageSize);
        }
        Ok(Pageable::Paged { page, size, sort })
    }

    pub fn is_paged(&self) -> bool {
        matches!(self, Pageable::Paged { .. })
    }

    /// Zero-based page index; always 0 when unpaged.
    pub fn page_number(&self) -> usize {
        match self {
            Pageable::Unpaged { .. } => 0,
            Pageable::Paged { page, .. } => *page,
        }
    }

    pub fn page_size(&self) -> Option<usize> {
        match self {
            Pageable::Unpaged { .. } => None,
            Pageable::Paged { size, .. } => Some(*size),
        }
    }

    /// Number of elements to skip before this page.
    pub fn offset(&self) -> usize {
        match self {
            Pageable::Unpaged { .. } => 0,
            Pageable::Paged { page, size, .. } => page.saturating_mul(*size),
        }
    }

    pub fn sort(&self) -> &Sort {
        match self {
            Pageable::Unpaged { sort } | Pageable::Paged { sort, .. } => sort,
        }
    }

    pub fn has_previous(&self) -> bool {
        self.page_number() > 0
    }

    pub fn next(&self) -> Self {
        match self {
            Pageable::Unpaged { .. } => self.clone(),
            Pageable::Paged { page, size, sort } => Pageable::Paged {
                page: page.saturating_add(1),
                size: *size,
                sort: sort.clone(),
            },
        }
    }

    pub fn previous_or_first(&self) -> Self {
        match self {
            Pageable::Unpaged { .. } => self.clone(),
            Pageable::Paged { page, size, sort } => Pageable::Paged {
                page: page.saturating_sub(1),
                size: *size,
                sort: sort.clone(),
            },
        }
    }

    pub fn first(&self) -> Self {
        match self {
            Pageable::Unpaged { .. } => self.clone(),
            Pageable::Paged { size, sort, .. } => Pageable::Paged {
                page: 0,
                size: *size,
                sort: sort.clone(),
            },
        }
    }
}

/// One window of a larger result set plus the metadata needed to navigate it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    content: Vec<T>,
    pageable: Pageable,
    total: u64,
}

impl<T> Page<T> {
    /// Build a page. When the request reaches past `total` while content is
    /// present (a short last page), `total` is raised to `offset + len`.
    pub fn new(content: Vec<T>, pageable: Pageable, total: u64) -> Self {
        let total = match pageable.page_size() {
            Some(size) if !content.is_empty() => {
                let offset = pageable.offset() as u64;
                if offset.saturating_add(size as u64) > total {
                    offset.saturating_add(content.len() as u64)
                } else {
                    total
                }
            }
            _ => total,
        };
        Self {
            content,
            pageable,
            total,
        }
    }

    /// A single page holding the entire result.
    pub fn unpaged(content: Vec<T>) -> Self {
        let total = content.len() as u64;
        Self {
            content,
            pageable: Pageable::unpaged(),
            total,
        }
    }

    pub fn empty(pageable: Pageable) -> Self {
        Self {
            content: Vec::new(),
            pageable,
            total: 0,
        }
    }

    pub fn number(&self) -> usize {
        self.pageable.page_number()
    }

    /// Requested page size, or the content length when unpaged.
    pub fn size(&self) -> usize {
        self.pageable.page_size().unwrap_or(self.content.len())
    }

    pub fn number_of_elements(&self) -> usize {
        self.content.len()
    }

    pub fn total_elements(&self) -> u64 {
        self.total
    }

    pub fn total_pages(&self) -> u64 {
        let size = self.size() as u64;
        if size == 0 {
            1
        } else {
            self.total.div_ceil(size)
        }
    }

    pub fn has_content(&self) -> bool {
        !self.content.is_empty()
    }

    pub fn has_next(&self) -> bool {
        (self.number() as u64).saturating_add(1) < self.total_pages()
    }

    pub fn has_previous(&self) -> bool {
        self.number() > 0
    }

    pub fn is_first(&self) -> bool {
        !self.has_previous()
    }

    pub fn is_last(&self) -> bool {
        !self.has_next()
    }

    pub fn next_pageable(&self) -> Option<Pageable> {
        self.has_next().then(|| self.pageable.next())
    }

    pub fn previous_pageable(&self) -> Option<Pageable> {
        self.has_previous()
            .then(|| self.pageable.previous_or_first())
    }

    pub fn content(&self) -> &[T] {
        &self.content
    }

    pub fn into_content(self) -> Vec<T> {
        self.content
    }

    pub fn pageable(&self) -> &Pageable {
        &self.pageable
    }

    pub fn sort(&self) -> &Sort {
        self.pageable.sort()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.content.iter()
    }

    /// Replace every element through `f`, keeping the metadata untouched.
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            content: self.content.into_iter().map(f).collect(),
            pageable: self.pageable,
            total: self.total,
        }
    }
}

impl<'a, T> IntoIterator for &'a Page<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
