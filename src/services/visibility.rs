//! Filtro de OTs por rol

use crate::models::{User, WorkOrder};

/// El administrador ve todas las OTs; el mecánico solo las que tiene asignadas.
pub fn visible_orders(orders: Vec<WorkOrder>, user: &User) -> Vec<WorkOrder> {
    if user.is_admin() {
        return orders;
    }
    orders
        .into_iter()
        .filter(|order| order.is_assigned_to(user.id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use uuid::Uuid;

    fn user(role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Prueba".to_string(),
            email: "prueba@gesticar.cl".to_string(),
            password_hash: String::new(),
            role,
        }
    }

    #[test]
    fn test_admin_sees_everything() {
        let orders = vec![WorkOrder::new(1001, "ABCD12"), WorkOrder::new(1002, "EFGH34")];
        assert_eq!(visible_orders(orders, &user(Role::Admin)).len(), 2);
    }

    #[test]
    fn test_mechanic_sees_assigned_only() {
        let mechanic = user(Role::Mechanic);
        let mut assigned = WorkOrder::new(1001, "ABCD12");
        assigned.mechanic_ids.push(mechanic.id);
        let mut other = WorkOrder::new(1002, "EFGH34");
        other.mechanic_ids.push(Uuid::new_v4());

        let visible = visible_orders(vec![assigned, other, WorkOrder::new(1003, "IJKL56")], &mechanic);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].number, 1001);
    }
}
