use super::{
    Colour, NodeId, NodeTransform, RenderError, RenderResult, SceneManager, SceneObject, SkyPlane,
};
use std::collections::{BTreeMap, HashMap};

const ROOT: NodeId = NodeId(0);

#[derive(Debug, Default)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    transform: NodeTransform,
}

#[derive(Debug)]
struct Attached {
    node: NodeId,
    object: SceneObject,
}

/// Node hierarchy plus the named objects hanging off it.
#[derive(Debug)]
pub struct SceneGraph {
    kind: String,
    ambient: Colour,
    nodes: HashMap<NodeId, Node>,
    objects: BTreeMap<String, Attached>,
    sky: Option<SkyPlane>,
    next_node: u64,
}

impl SceneGraph {
    pub fn new(kind: impl Into<String>) -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(ROOT, Node::default());
        Self {
            kind: kind.into(),
            ambient: Colour::BLACK,
            nodes,
            objects: BTreeMap::new(),
            sky: None,
            next_node: 1,
        }
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(&node)
            .map(|node| node.children.clone())
            .unwrap_or_default()
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(&node).and_then(|node| node.parent)
    }

    pub fn objects_on(&self, node: NodeId) -> Vec<&str> {
        self.objects
            .iter()
            .filter(|(_, attached)| attached.node == node)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    fn collect_subtree(&self, node: NodeId, out: &mut Vec<NodeId>) {
        out.push(node);
        if let Some(entry) = self.nodes.get(&node) {
            for child in &entry.children {
                self.collect_subtree(*child, out);
            }
        }
    }

    fn node_mut(&mut self, node: NodeId) -> RenderResult<&mut Node> {
        self.nodes.get_mut(&node).ok_or(RenderError::NoSuchNode(node))
    }
}

impl SceneManager for SceneGraph {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn ambient_light(&self) -> Colour {
        self.ambient
    }

    fn set_ambient_light(&mut self, colour: Colour) {
        self.ambient = colour;
    }

    fn root_node(&self) -> NodeId {
        ROOT
    }

    fn create_child_node(&mut self, parent: NodeId) -> RenderResult<NodeId> {
        let id = NodeId(self.next_node);
        self.node_mut(parent)?.children.push(id);
        self.next_node += 1;
        self.nodes.insert(
            id,
            Node {
                parent: Some(parent),
                ..Node::default()
            },
        );
        Ok(id)
    }

    fn destroy_node(&mut self, node: NodeId) -> RenderResult<()> {
        if node == ROOT {
            return Err(RenderError::RootNode);
        }
        if !self.nodes.contains_key(&node) {
            return Err(RenderError::NoSuchNode(node));
        }

        let mut doomed = Vec::new();
        self.collect_subtree(node, &mut doomed);

        if let Some(parent) = self.parent(node) {
            if let Some(parent) = self.nodes.get_mut(&parent) {
                parent.children.retain(|child| *child != node);
            }
        }
        for id in &doomed {
            self.nodes.remove(id);
        }
        self.objects
            .retain(|_, attached| !doomed.contains(&attached.node));
        Ok(())
    }

    fn set_transform(&mut self, node: NodeId, transform: NodeTransform) -> RenderResult<()> {
        self.node_mut(node)?.transform = transform;
        Ok(())
    }

    fn transform(&self, node: NodeId) -> Option<NodeTransform> {
        self.nodes.get(&node).map(|node| node.transform)
    }

    fn attach_object(
        &mut self,
        name: &str,
        node: NodeId,
        object: SceneObject,
    ) -> RenderResult<()> {
        if !self.nodes.contains_key(&node) {
            return Err(RenderError::NoSuchNode(node));
        }
        self.objects
            .insert(name.to_string(), Attached { node, object });
        Ok(())
    }

    fn detach_object(&mut self, name: &str) -> Option<SceneObject> {
        self.objects.remove(name).map(|attached| attached.object)
    }

    fn object(&self, name: &str) -> Option<&SceneObject> {
        self.objects.get(name).map(|attached| &attached.object)
    }

    fn set_sky_plane(&mut self, sky: Option<SkyPlane>) {
        self.sky = sky;
    }

    fn sky_plane(&self) -> Option<&SkyPlane> {
        self.sky.as_ref()
    }

    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn clear(&mut self) {
        self.nodes.retain(|id, _| *id == ROOT);
        if let Some(root) = self.nodes.get_mut(&ROOT) {
            root.children.clear();
        }
        self.objects.clear();
        self.sky = None;
    }
}
