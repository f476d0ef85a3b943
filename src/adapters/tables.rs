//! Entity tables shared by the store adapters.
//!
//! Every mutating method checks all of its preconditions before touching a
//! table, so an `Err` always means nothing was written.

use crate::domain::model::{
    Binding, BindingId, Guard, GuardId, GuardStatus, NewServiceRequest, RequestId, RequestState,
    ServiceRequest, Transition,
};
use crate::utils::error::{DispatchError, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tables {
    next_guard_id: u64,
    next_request_id: u64,
    next_binding_id: u64,
    guards: Vec<Guard>,
    requests: Vec<ServiceRequest>,
    bindings: Vec<Binding>,
}

impl Tables {
    fn guard_index(&self, id: GuardId) -> Result<usize> {
        self.guards
            .iter()
            .position(|g| g.id == id)
            .ok_or(DispatchError::NotFound {
                entity: "guard",
                id: id.get(),
            })
    }

    fn request_index(&self, id: RequestId) -> Result<usize> {
        self.requests
            .iter()
            .position(|r| r.id == id)
            .ok_or(DispatchError::NotFound {
                entity: "request",
                id: id.get(),
            })
    }

    pub fn get_request(&self, id: RequestId) -> Result<ServiceRequest> {
        let idx = self.request_index(id)?;
        Ok(self.requests[idx].clone())
    }

    pub fn insert_request(&mut self, new: NewServiceRequest) -> ServiceRequest {
        self.next_request_id += 1;
        let request = ServiceRequest {
            id: RequestId(self.next_request_id),
            client_id: new.client_id,
            service_time: new.service_time,
            duration_hours: new.duration_hours,
            state: RequestState::Pending,
            created_at: Utc::now(),
        };
        self.requests.push(request.clone());
        request
    }

    pub fn save_request(&mut self, request: &ServiceRequest) -> Result<()> {
        match self.requests.iter().position(|r| r.id == request.id) {
            Some(idx) => {
                let current = &self.requests[idx];
                if current.state == RequestState::Completed && current != request {
                    return Err(DispatchError::invalid_state(
                        "request",
                        request.id.get(),
                        current.state,
                        "completed requests are immutable",
                    ));
                }
                self.requests[idx] = request.clone();
            }
            None => {
                self.next_request_id = self.next_request_id.max(request.id.get());
                self.requests.push(request.clone());
                self.requests.sort_by_key(|r| r.id);
            }
        }
        Ok(())
    }

    pub fn list_requests(&self, filter: Option<RequestState>) -> Vec<ServiceRequest> {
        self.requests
            .iter()
            .filter(|r| filter.map_or(true, |state| r.state == state))
            .cloned()
            .collect()
    }

    pub fn get_guard(&self, id: GuardId) -> Result<Guard> {
        let idx = self.guard_index(id)?;
        Ok(self.guards[idx].clone())
    }

    pub fn insert_guard(&mut self, label: &str) -> Guard {
        self.next_guard_id += 1;
        let guard = Guard {
            id: GuardId(self.next_guard_id),
            label: label.to_string(),
            status: GuardStatus::Free,
        };
        self.guards.push(guard.clone());
        guard
    }

    pub fn save_guard(&mut self, guard: &Guard) {
        match self.guards.iter().position(|g| g.id == guard.id) {
            Some(idx) => self.guards[idx] = guard.clone(),
            None => {
                self.next_guard_id = self.next_guard_id.max(guard.id.get());
                self.guards.push(guard.clone());
                self.guards.sort_by_key(|g| g.id);
            }
        }
    }

    pub fn list_guards(&self, filter: Option<GuardStatus>) -> Vec<Guard> {
        self.guards
            .iter()
            .filter(|g| filter.map_or(true, |status| g.status == status))
            .cloned()
            .collect()
    }

    pub fn create_binding(&mut self, request_id: RequestId, guard_id: GuardId) -> Result<Binding> {
        self.request_index(request_id)?;
        self.guard_index(guard_id)?;

        self.next_binding_id += 1;
        let binding = Binding {
            id: BindingId(self.next_binding_id),
            request_id,
            guard_id,
            created_at: Utc::now(),
        };
        self.bindings.push(binding.clone());
        Ok(binding)
    }

    pub fn list_bindings(&self) -> Vec<Binding> {
        self.bindings.clone()
    }

    pub fn bindings_for_request(&self, request_id: RequestId) -> Vec<Binding> {
        self.bindings
            .iter()
            .filter(|b| b.request_id == request_id)
            .cloned()
            .collect()
    }

    pub fn apply(&mut self, transition: Transition) -> Result<Option<Binding>> {
        match transition {
            Transition::Assign {
                request_id,
                guard_id,
            } => {
                let req_idx = self.request_index(request_id)?;
                let guard_idx = self.guard_index(guard_id)?;

                let state = self.requests[req_idx].state;
                if !state.can_transition_to(RequestState::Assigned) {
                    return Err(DispatchError::invalid_state(
                        "request",
                        request_id.get(),
                        state,
                        "already assigned or completed",
                    ));
                }
                let guard = &self.guards[guard_idx];
                if !guard.is_free() {
                    return Err(DispatchError::invalid_state(
                        "guard",
                        guard_id.get(),
                        guard.status,
                        "guard is already committed",
                    ));
                }

                let binding = self.create_binding(request_id, guard_id)?;
                self.guards[guard_idx].status = GuardStatus::Committed;
                self.requests[req_idx].state = RequestState::Assigned;
                Ok(Some(binding))
            }
            Transition::Complete {
                request_id,
                release,
            } => {
                let req_idx = self.request_index(request_id)?;
                let guard_idx = release.map(|id| self.guard_index(id)).transpose()?;

                let state = self.requests[req_idx].state;
                if !state.can_transition_to(RequestState::Completed) {
                    return Err(DispatchError::invalid_state(
                        "request",
                        request_id.get(),
                        state,
                        "only assigned requests can be completed",
                    ));
                }

                self.requests[req_idx].state = RequestState::Completed;
                if let Some(idx) = guard_idx {
                    self.guards[idx].status = GuardStatus::Free;
                }
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn submission() -> NewServiceRequest {
        NewServiceRequest {
            client_id: "client-a".to_string(),
            service_time: Utc.with_ymd_and_hms(2026, 11, 1, 8, 0, 0).unwrap(),
            duration_hours: 4,
        }
    }

    #[test]
    fn test_assign_applies_all_writes() {
        let mut tables = Tables::default();
        let guard = tables.insert_guard("North Gate");
        let request = tables.insert_request(submission());

        let binding = tables
            .apply(Transition::Assign {
                request_id: request.id,
                guard_id: guard.id,
            })
            .unwrap()
            .unwrap();

        assert_eq!(binding.guard_id, guard.id);
        assert_eq!(tables.get_guard(guard.id).unwrap().status, GuardStatus::Committed);
        assert_eq!(
            tables.get_request(request.id).unwrap().state,
            RequestState::Assigned
        );
    }

    #[test]
    fn test_rejected_assign_writes_nothing() {
        let mut tables = Tables::default();
        let guard = tables.insert_guard("North Gate");
        let first = tables.insert_request(submission());
        let second = tables.insert_request(submission());
        tables
            .apply(Transition::Assign {
                request_id: first.id,
                guard_id: guard.id,
            })
            .unwrap();

        let err = tables
            .apply(Transition::Assign {
                request_id: second.id,
                guard_id: guard.id,
            })
            .unwrap_err();

        assert!(matches!(err, DispatchError::InvalidState { entity: "guard", .. }));
        assert_eq!(
            tables.get_request(second.id).unwrap().state,
            RequestState::Pending
        );
        assert_eq!(tables.list_bindings().len(), 1);
    }

    #[test]
    fn test_completed_request_is_immutable() {
        let mut tables = Tables::default();
        let guard = tables.insert_guard("North Gate");
        let request = tables.insert_request(submission());
        tables
            .apply(Transition::Assign {
                request_id: request.id,
                guard_id: guard.id,
            })
            .unwrap();
        tables
            .apply(Transition::Complete {
                request_id: request.id,
                release: Some(guard.id),
            })
            .unwrap();

        let mut reopened = tables.get_request(request.id).unwrap();
        reopened.state = RequestState::Pending;
        assert!(tables.save_request(&reopened).is_err());
        assert!(tables.get_guard(guard.id).unwrap().is_free());
    }
}
