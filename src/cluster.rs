use crate::point::Point;

/// A cluster is a collection of points sharing an assignment; ordering
/// within a cluster carries no meaning.
pub type Cluster = Vec<Point>;

/// A fixed-size list of clusters. The index is the cluster's identity:
/// centroids and clusters at the same index always correspond.
pub type ClusterList = Vec<Cluster>;

/// Total number of points across every cluster in the list.
pub fn total_points(list: &ClusterList) -> usize {
    list.iter().map(Vec::len).sum()
}

/// Index-wise union of per-worker cluster lists into one global list.
///
/// After the aggregation round every worker labels its points under the
/// same global indices, so the combined clustering is the concatenation
/// of the members at each index.
pub fn merge_cluster_lists(lists: impl IntoIterator<Item = ClusterList>) -> ClusterList {
    let mut merged = ClusterList::new();
    for list in lists {
        if merged.len() < list.len() {
            merged.resize(list.len(), Cluster::new());
        }
        for (i, cluster) in list.into_iter().enumerate() {
            merged[i].extend(cluster);
        }
    }
    merged
}
