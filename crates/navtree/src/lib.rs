#![doc = include_str!("../README.md")]

mod config;
mod dispatch;
mod error;
mod handler;
mod mutate;
mod node;
mod path;
mod redirect;
mod resolve;
mod store;
mod tree;

pub mod v1 {
    //! Versioned public API for routing trees.
    //!
    //! # Tree
    //!
    //! - [`Node`]: a route with its slug, parent and cached url
    //! - [`RouteTree`]: a store plus handler registry, with the mutation and
    //!   lookup operations
    //!
    //! # Storage
    //!
    //! - [`NodeReader`] / [`NodeStore`]: what a backing store must provide
    //! - [`MemoryStore`]: in-memory store that counts its round-trips
    //!
    //! # Dispatch
    //!
    //! - [`Handler`]: per-node handling of the path below a node
    //! - [`HandlerRegistry`]: dotted-path table of handler factories
    //! - [`SimpleHandler`], [`RedirectHandler`]: stock handlers
    //!
    //! # Example: rename a branch and resolve beneath it
    //!
    //! ```
    //! use navtree::v1::*;
    //!
    //! let mut tree = RouteTree::in_memory();
    //! let root = tree.create_root("site.handlers.Home").unwrap();
    //! let blog = tree
    //!     .create_child(root.id.unwrap(), "blog", "site.handlers.Blog")
    //!     .unwrap();
    //! let post = tree
    //!     .create_child(blog.id.unwrap(), "hello", "site.handlers.Post")
    //!     .unwrap();
    //! assert_eq!(post.url, "/blog/hello/");
    //!
    //! tree.rename(blog.id.unwrap(), "news").unwrap();
    //! assert_eq!(tree.get(post.id.unwrap()).unwrap().url, "/news/hello/");
    //!
    //! let hit = tree.resolve("/news/hello/comments/").unwrap();
    //! assert_eq!(hit.node.id, post.id);
    //! assert_eq!(hit.remainder, "/comments/");
    //!
    //! // Nothing below the old name remains; the root catches it.
    //! assert_eq!(tree.best_match("/blog/hello/").unwrap().url, "/");
    //! ```

    /// Url algebra used by the tree.
    ///
    /// ```
    /// use navtree::v1::path;
    ///
    /// assert_eq!(path::join_path("/blog/", "hello"), "/blog/hello/");
    /// assert_eq!(path::split_path("/blog/hello/").len(), 3);
    /// assert!(path::validate_slug("hello-world").is_ok());
    /// ```
    pub mod path {
        pub use crate::path::{
            ROOT_URL, is_routable, join_path, node_relative, split_path, validate_slug,
        };
    }

    /// Lower-level operations behind [`RouteTree`](super::RouteTree), usable
    /// with any [`NodeStore`](super::NodeStore).
    pub mod ops {
        pub use crate::dispatch::dispatch;
        pub use crate::mutate::{compute_url, save, verify};
        pub use crate::redirect::validate as validate_redirect;
        pub use crate::resolve::{best_match, resolve};
    }

    pub use crate::config::{CheckMessage, HandlerChoice, Settings, check};
    pub use crate::dispatch::{Handler, Request, Response, SimpleHandler};
    pub use crate::error::{Constraint, HandlerError, Result, TreeError};
    pub use crate::handler::{HandlerFactory, HandlerRegistry, HandlerRegistryBuilder, Importable};
    pub use crate::mutate::{Inconsistency, Problem};
    pub use crate::node::{Node, NodeId};
    pub use crate::redirect::{Redirect, RedirectHandler};
    pub use crate::resolve::Resolution;
    pub use crate::store::{MemoryStore, NodeReader, NodeStore, QueryStats};
    pub use crate::tree::RouteTree;
}
